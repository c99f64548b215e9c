//! Rectifications: negated drafts linked to their issued original

use rust_decimal_macros::dec;

use domain_invoicing::{
    InvoiceEventType, InvoiceStatus, InvoicingError, RectificationType, DRAFT_NUMBER_PLACEHOLDER,
};
use test_utils::{
    assert_single_event, assert_sum_invariant, CounterpartyFixtures, DraftSpecBuilder, LineFixtures, TestHarness,
};

#[tokio::test]
async fn test_total_rectification_negates_original() {
    let h = TestHarness::new().await;
    let original = h.issued().await;

    let draft = h
        .service
        .create_rectification(h.issuer_id, original.id, "Wrong billing period", RectificationType::Total)
        .await
        .unwrap();

    assert_eq!(draft.status, InvoiceStatus::Draft);
    assert_eq!(draft.series, "RECT");
    assert_eq!(draft.number, DRAFT_NUMBER_PLACEHOLDER);
    assert_eq!(draft.subtotal, dec!(-200.00));
    assert_eq!(draft.tax_amount, dec!(-42.00));
    assert_eq!(draft.total, dec!(-242.00));
    assert_eq!(draft.lines[0].quantity, original.lines[0].quantity);
    assert_eq!(draft.lines[0].unit_price, -original.lines[0].unit_price);
    assert_sum_invariant(&draft);

    let link = draft.rectification.as_ref().unwrap();
    assert_eq!(link.rectifies_invoice_id, original.id);
    assert_eq!(link.rectifies_number, "2026-0001");
    assert_eq!(link.reason, "Wrong billing period");
    assert_eq!(draft.counterparty, original.counterparty);
    assert_eq!(draft.counterparty_snapshot, original.counterparty_snapshot);

    let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
    let rectifies = assert_single_event(&events, InvoiceEventType::Rectifies);
    assert_eq!(rectifies.metadata["rectifies_number"], "2026-0001");

    // The original is untouched until the rectification is issued
    let untouched = h.service.get_invoice(h.issuer_id, original.id).await.unwrap().invoice;
    assert_eq!(untouched, original);
}

#[tokio::test]
async fn test_issuing_rectification_links_both_sides() {
    let h = TestHarness::new().await;
    let original = h.issued().await;
    let draft = h
        .service
        .create_rectification(h.issuer_id, original.id, "Duplicate charge", RectificationType::Total)
        .await
        .unwrap();

    let issued = h.issue(&draft).await;
    assert_eq!(issued.series, "RECT");
    assert_eq!(issued.number, "2026-0001");
    assert_eq!(issued.totals_snapshot.as_ref().unwrap().total, dec!(-242.00));

    let original_events = h.service.list_invoice_events(h.issuer_id, original.id).await.unwrap();
    let linked = assert_single_event(&original_events, InvoiceEventType::RectificationIssued);
    assert_eq!(linked.metadata["rectification_number"], "2026-0001");
    assert_eq!(linked.metadata["rectification_id"], serde_json::json!(issued.id));

    let original_after = h.service.get_invoice(h.issuer_id, original.id).await.unwrap().invoice;
    assert_eq!(original_after.status, InvoiceStatus::Sent);
    assert_eq!(original_after.total, dec!(242.00));
}

#[tokio::test]
async fn test_rectification_keeps_frozen_counterparty() {
    let h = TestHarness::new().await;
    let original = h.issued().await;

    let mut changed = CounterpartyFixtures::acme();
    changed.legal_name = Some("Acme Renamed SL".to_string());
    h.directory.upsert(h.issuer_id, original.counterparty.unwrap(), changed).await;

    let draft = h
        .service
        .create_rectification(h.issuer_id, original.id, "Price error", RectificationType::Total)
        .await
        .unwrap();
    let issued = h.issue(&draft).await;

    assert_eq!(
        issued.counterparty_snapshot.unwrap().legal_name.as_deref(),
        Some("Acme Industries SL")
    );
}

#[tokio::test]
async fn test_partial_rectification_starts_from_zero_line() {
    let h = TestHarness::new().await;
    let original = h.issued().await;

    let draft = h
        .service
        .create_rectification(h.issuer_id, original.id, "Discount agreed later", RectificationType::Partial)
        .await
        .unwrap();

    assert_eq!(draft.lines.len(), 1);
    assert_eq!(draft.lines[0].description, "Rectification of invoice 2026-0001");
    assert_eq!(draft.lines[0].tax_percent, dec!(21));
    assert_eq!(draft.total, dec!(0.00));

    // Negative amounts are accepted on rectification drafts
    let spec = DraftSpecBuilder::customer(original.counterparty.unwrap())
        .lines(vec![LineFixtures::priced("Agreed discount", dec!(1), dec!(-50))])
        .build();
    let edited = h.service.update_draft_invoice(h.issuer_id, draft.id, spec).await.unwrap();
    assert_eq!(edited.total, dec!(-60.50));
    assert_sum_invariant(&edited);
}

#[tokio::test]
async fn test_rectification_counterparty_is_fixed() {
    let h = TestHarness::new().await;
    let original = h.issued().await;
    let draft = h
        .service
        .create_rectification(h.issuer_id, original.id, "Typo", RectificationType::Partial)
        .await
        .unwrap();

    let other = h.add_client().await;
    let spec = DraftSpecBuilder::customer(other).build();
    let err = h.service.update_draft_invoice(h.issuer_id, draft.id, spec).await.unwrap_err();
    assert!(err
        .messages()
        .unwrap()
        .contains(&"The counterparty of a rectification cannot change".to_string()));
}

#[tokio::test]
async fn test_unrectifiable_originals() {
    let h = TestHarness::new().await;

    let draft = h.draft().await;
    let on_draft = h
        .service
        .create_rectification(h.issuer_id, draft.id, "Reason", RectificationType::Total)
        .await;
    assert!(matches!(on_draft, Err(InvoicingError::InvalidState { .. })));

    let issued = h.issued().await;
    let no_reason = h
        .service
        .create_rectification(h.issuer_id, issued.id, "  ", RectificationType::Total)
        .await;
    assert!(matches!(no_reason, Err(InvoicingError::Validation(_))));

    let rectification = h
        .service
        .create_rectification(h.issuer_id, issued.id, "Reason", RectificationType::Total)
        .await
        .unwrap();
    let rectification = h.issue(&rectification).await;
    let chained = h
        .service
        .create_rectification(h.issuer_id, rectification.id, "Reason", RectificationType::Total)
        .await;
    assert!(matches!(chained, Err(InvoicingError::Validation(_))));

    h.service.cancel_invoice(h.issuer_id, issued.id).await.unwrap();
    let on_canceled = h
        .service
        .create_rectification(h.issuer_id, issued.id, "Reason", RectificationType::Total)
        .await;
    assert!(matches!(on_canceled, Err(InvoicingError::InvalidState { .. })));
}
