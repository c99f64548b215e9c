//! Invoice lifecycle tests over the in-memory adapters

use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, PortError};
use domain_invoicing::{
    CancelOutcome, DueState, InvoiceEventType, InvoiceFilter, InvoiceQuery, InvoiceStatus,
    InvoiceStore, InvoicingError, IssueOutcome, NewPayment, PaymentMethod, RectificationType,
    DRAFT_NUMBER_PLACEHOLDER,
};
use test_utils::{
    assert_single_event, assert_sum_invariant, count_events, BrandingFixtures, CounterpartyFixtures,
    DraftSpecBuilder, LineFixtures, TemporalFixtures, TestHarness,
};

fn eur(amount: rust_decimal::Decimal) -> Money {
    Money::new(amount, Currency::EUR)
}

mod drafts {
    use super::*;

    #[tokio::test]
    async fn test_create_computes_totals_and_applies_branding_defaults() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;

        assert_eq!(draft.status, InvoiceStatus::Draft);
        assert_eq!(draft.number, DRAFT_NUMBER_PLACEHOLDER);
        assert_eq!(draft.series, "INV");
        assert_eq!(draft.sequence, None);
        assert_eq!(draft.subtotal, dec!(200.00));
        assert_eq!(draft.tax_amount, dec!(42.00));
        assert_eq!(draft.total, dec!(242.00));
        assert_sum_invariant(&draft);

        assert_eq!(draft.notes.as_deref(), Some("Thank you for your business."));
        assert_eq!(draft.terms.as_deref(), Some("Payment due within 30 days."));
        assert!(draft.payment_details.is_some());
        assert!(draft.company_snapshot.is_none());
        assert!(draft.counterparty_snapshot.is_none());

        let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
        assert_single_event(&events, InvoiceEventType::Created);
    }

    #[tokio::test]
    async fn test_customer_invoice_requires_client() {
        let h = TestHarness::new().await;
        let mut spec = DraftSpecBuilder::customer(CounterpartyFixtures::new_client()).build();
        spec.counterparty = None;

        let err = h.service.create_invoice(h.issuer_id, spec).await.unwrap_err();
        let messages = err.messages().expect("validation error");
        assert!(messages.contains(&"A customer invoice requires a client".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_lines_are_reported_together() {
        let h = TestHarness::new().await;
        let client = h.add_client().await;
        let mut negative = LineFixtures::consulting();
        negative.quantity = dec!(-1);
        let spec = DraftSpecBuilder::customer(client)
            .lines(vec![negative, LineFixtures::priced("", dec!(1), dec!(-5))])
            .build();

        let err = h.service.create_invoice(h.issuer_id, spec).await.unwrap_err();
        let messages = err.messages().expect("validation error");
        assert!(messages.iter().any(|m| m.contains("quantity cannot be negative")));
        assert!(messages.iter().any(|m| m.contains("description is required")));
        assert!(messages.iter().any(|m| m.contains("unit price cannot be negative")));
    }

    #[tokio::test]
    async fn test_update_replaces_lines_and_recomputes() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let spec = DraftSpecBuilder::customer(draft.counterparty.unwrap())
            .lines(vec![LineFixtures::licence_tax_inclusive()])
            .notes("Updated")
            .build();

        let updated = h.service.update_draft_invoice(h.issuer_id, draft.id, spec).await.unwrap();

        assert_eq!(updated.lines.len(), 1);
        assert_eq!(updated.subtotal, dec!(100.00));
        assert_eq!(updated.tax_amount, dec!(21.00));
        assert_eq!(updated.total, dec!(121.00));
        assert_eq!(updated.version, draft.version + 1);
        assert_eq!(updated.notes.as_deref(), Some("Updated"));
        assert_sum_invariant(&updated);

        let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
        assert_single_event(&events, InvoiceEventType::Edited);
    }

    #[tokio::test]
    async fn test_update_drops_cached_document() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        h.service.regenerate_document(h.issuer_id, draft.id).await.unwrap();
        assert!(h.documents_has(draft.id).await);

        let spec = DraftSpecBuilder::customer(draft.counterparty.unwrap()).build();
        h.service.update_draft_invoice(h.issuer_id, draft.id, spec).await.unwrap();
        assert!(!h.documents_has(draft.id).await);
    }

    #[tokio::test]
    async fn test_issued_invoice_cannot_be_edited_or_deleted() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;
        let spec = DraftSpecBuilder::customer(issued.counterparty.unwrap()).build();

        let edit = h.service.update_draft_invoice(h.issuer_id, issued.id, spec).await;
        assert!(matches!(edit, Err(InvoicingError::InvalidState { status: InvoiceStatus::Sent, .. })));

        let delete = h.service.delete_draft_invoice(h.issuer_id, issued.id).await;
        assert!(matches!(delete, Err(InvoicingError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_delete_draft() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        h.service.delete_draft_invoice(h.issuer_id, draft.id).await.unwrap();

        let missing = h.service.get_invoice(h.issuer_id, draft.id).await;
        assert!(matches!(missing, Err(InvoicingError::NotFound(id)) if id == draft.id));
    }

    #[tokio::test]
    async fn test_other_issuers_cannot_see_invoice() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let other = core_kernel::IssuerId::new();

        let result = h.service.get_invoice(other, draft.id).await;
        assert!(matches!(result, Err(InvoicingError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_by_store() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let spec = DraftSpecBuilder::customer(draft.counterparty.unwrap()).build();
        h.service.update_draft_invoice(h.issuer_id, draft.id, spec).await.unwrap();

        let stale = h.store.save(&draft, draft.version, Vec::new()).await;
        assert!(matches!(stale, Err(PortError::Conflict { .. })));
    }
}

mod issuance {
    use super::*;

    #[tokio::test]
    async fn test_issue_assigns_number_and_freezes_snapshots() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let issued = h.issue(&draft).await;

        assert_eq!(issued.status, InvoiceStatus::Sent);
        assert_eq!(issued.number, "2026-0001");
        assert_eq!(issued.sequence, Some(1));
        assert!(issued.issued_at.is_some());
        assert_eq!(issued.company_snapshot.as_ref().unwrap().company_name, "Studio Norte SL");
        assert_eq!(
            issued.counterparty_snapshot.as_ref().unwrap().legal_name.as_deref(),
            Some("Acme Industries SL")
        );
        assert_eq!(issued.items_snapshot.as_ref().unwrap().len(), 1);
        assert_eq!(issued.totals_snapshot.unwrap().total, dec!(242.00));

        let events = h.service.list_invoice_events(h.issuer_id, issued.id).await.unwrap();
        let sent = assert_single_event(&events, InvoiceEventType::Sent);
        assert_eq!(sent.metadata["number"], "2026-0001");
    }

    #[tokio::test]
    async fn test_issue_is_idempotent() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let first = h.issue(&draft).await;

        let second = h.service.issue_invoice(h.issuer_id, draft.id).await.unwrap();
        assert!(matches!(second, IssueOutcome::AlreadyIssued(_)));
        assert_eq!(second.invoice(), &first);

        let stored = h.service.get_invoice(h.issuer_id, draft.id).await.unwrap().invoice;
        assert_eq!(stored, first);
        let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
        assert_eq!(count_events(&events, InvoiceEventType::Sent), 1);
    }

    #[tokio::test]
    async fn test_incomplete_counterparty_blocks_issuance() {
        let h = TestHarness::new().await;
        let client = h
            .add_counterparty(CounterpartyFixtures::new_client(), CounterpartyFixtures::incomplete())
            .await;
        let draft = h.draft_from(DraftSpecBuilder::customer(client).build()).await;

        let eligibility = h.service.get_issue_eligibility(h.issuer_id, draft.id).await.unwrap();
        assert!(!eligibility.eligible);
        assert_eq!(
            eligibility.missing,
            vec![
                "Counterparty tax identifier is missing".to_string(),
                "Counterparty address is missing".to_string(),
            ]
        );

        let err = h.service.issue_invoice(h.issuer_id, draft.id).await.unwrap_err();
        assert_eq!(err.messages().map(|m| m.to_vec()), Some(eligibility.missing));

        let still_draft = h.service.get_invoice(h.issuer_id, draft.id).await.unwrap().invoice;
        assert_eq!(still_draft.status, InvoiceStatus::Draft);
        assert_eq!(still_draft.number, DRAFT_NUMBER_PLACEHOLDER);
        assert!(still_draft.company_snapshot.is_none());
    }

    #[tokio::test]
    async fn test_incomplete_issuer_blocks_issuance() {
        let h = TestHarness::new().await;
        h.set_branding(BrandingFixtures::without_tax_id()).await;
        let draft = h.draft().await;

        let err = h.service.issue_invoice(h.issuer_id, draft.id).await.unwrap_err();
        let messages = err.messages().expect("validation error");
        assert_eq!(messages, ["Issuer tax identifier is missing".to_string()]);
    }

    #[tokio::test]
    async fn test_eligibility_of_complete_draft() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let eligibility = h.service.get_issue_eligibility(h.issuer_id, draft.id).await.unwrap();
        assert!(eligibility.eligible);
        assert!(eligibility.missing.is_empty());

        // Pre-flight has no side effects
        let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_survive_edits_to_live_records() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;
        let client = issued.counterparty.unwrap();

        let mut renamed = CounterpartyFixtures::acme();
        renamed.legal_name = Some("Acme Holdings Group".to_string());
        renamed.tax_id = Some("B00000000".to_string());
        h.directory.upsert(h.issuer_id, client, renamed).await;
        let mut rebranded = BrandingFixtures::studio();
        rebranded.company_name = "Studio Sur SL".to_string();
        h.set_branding(rebranded).await;

        let reread = h.service.get_invoice(h.issuer_id, issued.id).await.unwrap().invoice;
        assert_eq!(reread.counterparty_snapshot, issued.counterparty_snapshot);
        assert_eq!(reread.company_snapshot, issued.company_snapshot);

        let document = h.service.regenerate_document(h.issuer_id, issued.id).await.unwrap();
        let body = String::from_utf8(document.content).unwrap();
        assert!(body.contains("Acme Industries SL"));
        assert!(body.contains("Studio Norte SL"));
        assert!(!body.contains("Acme Holdings Group"));
        assert!(!body.contains("Studio Sur SL"));
        assert_eq!(document.number, "2026-0001");
    }

    #[tokio::test]
    async fn test_document_is_generated_after_issuance() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;

        for _ in 0..100 {
            if h.documents_has(issued.id).await {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("document was not generated after issuance");
    }
}

mod payments {
    use super::*;

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;

        let partial = h
            .service
            .register_payment(h.issuer_id, issued.id, NewPayment::new(eur(dec!(100)), PaymentMethod::BankTransfer))
            .await
            .unwrap();
        assert_eq!(partial.status, InvoiceStatus::Partial);
        assert_eq!(partial.paid_at, None);

        let view = h.service.get_invoice(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(view.amount_paid, dec!(100.00));
        assert_eq!(view.balance_due, dec!(142.00));

        let paid_at = TemporalFixtures::noon(2026, 3, 1);
        let paid = h
            .service
            .register_payment(
                h.issuer_id,
                issued.id,
                NewPayment::new(eur(dec!(142)), PaymentMethod::Card).paid_at(paid_at),
            )
            .await
            .unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.paid_at, Some(paid_at));
        assert_eq!(paid.payments.len(), 2);

        let events = h.service.list_invoice_events(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(count_events(&events, InvoiceEventType::Payment), 2);
        assert_single_event(&events, InvoiceEventType::Paid);
    }

    #[tokio::test]
    async fn test_overpayment_still_paid_once() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;
        for amount in [dec!(300), dec!(10)] {
            h.service
                .register_payment(h.issuer_id, issued.id, NewPayment::new(eur(amount), PaymentMethod::Cash))
                .await
                .unwrap();
        }
        let view = h.service.get_invoice(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(view.invoice.status, InvoiceStatus::Paid);
        assert_eq!(view.balance_due, dec!(-68.00));
        assert_eq!(view.due.state, DueState::Paid);

        let events = h.service.list_invoice_events(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(count_events(&events, InvoiceEventType::Paid), 1);
    }

    #[tokio::test]
    async fn test_payment_rejections() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        let on_draft = h
            .service
            .register_payment(h.issuer_id, draft.id, NewPayment::new(eur(dec!(10)), PaymentMethod::Cash))
            .await;
        assert!(matches!(on_draft, Err(InvoicingError::InvalidState { .. })));

        let issued = h.issue(&draft).await;
        let zero = h
            .service
            .register_payment(h.issuer_id, issued.id, NewPayment::new(eur(dec!(0)), PaymentMethod::Cash))
            .await;
        assert!(matches!(zero, Err(InvoicingError::Validation(_))));

        let usd = h
            .service
            .register_payment(
                h.issuer_id,
                issued.id,
                NewPayment::new(Money::new(dec!(10), Currency::USD), PaymentMethod::Cash),
            )
            .await;
        assert!(matches!(usd, Err(InvoicingError::Validation(_))));

        h.service.cancel_invoice(h.issuer_id, issued.id).await.unwrap();
        let on_canceled = h
            .service
            .register_payment(h.issuer_id, issued.id, NewPayment::new(eur(dec!(10)), PaymentMethod::Cash))
            .await;
        assert!(matches!(
            on_canceled,
            Err(InvoicingError::InvalidState { status: InvoiceStatus::Canceled, .. })
        ));
    }
}

mod cancellation {
    use super::*;

    #[tokio::test]
    async fn test_cancel_is_sticky_and_idempotent() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;

        let first = h.service.cancel_invoice(h.issuer_id, issued.id).await.unwrap();
        assert!(matches!(first, CancelOutcome::Canceled(_)));
        assert_eq!(first.invoice().status, InvoiceStatus::Canceled);
        assert_eq!(first.invoice().number, "2026-0001");
        assert!(first.invoice().canceled_at.is_some());

        let second = h.service.cancel_invoice(h.issuer_id, issued.id).await.unwrap();
        assert!(matches!(second, CancelOutcome::AlreadyCancelled(_)));

        let events = h.service.list_invoice_events(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(count_events(&events, InvoiceEventType::Canceled), 1);
        assert_eq!(count_events(&events, InvoiceEventType::Sent), 1);
    }

    #[tokio::test]
    async fn test_cancel_draft_never_allocates() {
        let h = TestHarness::new().await;
        let draft = h.draft().await;
        h.service.cancel_invoice(h.issuer_id, draft.id).await.unwrap();

        let issue = h.service.issue_invoice(h.issuer_id, draft.id).await;
        assert!(matches!(issue, Err(InvoicingError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_paid_invoice_cannot_be_canceled() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;
        h.service
            .register_payment(h.issuer_id, issued.id, NewPayment::new(eur(dec!(242)), PaymentMethod::Cash))
            .await
            .unwrap();

        let result = h.service.cancel_invoice(h.issuer_id, issued.id).await;
        assert!(matches!(result, Err(InvoicingError::InvalidState { status: InvoiceStatus::Paid, .. })));
    }
}

mod reads {
    use super::*;

    #[tokio::test]
    async fn test_view_marks_sent_invoice_viewed_once() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;

        let viewed = h.service.record_view(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(viewed.status, InvoiceStatus::Viewed);
        h.service.record_view(h.issuer_id, issued.id).await.unwrap();

        let events = h.service.list_invoice_events(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(count_events(&events, InvoiceEventType::Viewed), 1);
    }

    #[tokio::test]
    async fn test_due_info_is_computed_on_read() {
        let h = TestHarness::new().await;
        let client = h.add_client().await;
        let spec = DraftSpecBuilder::customer(client)
            .issue_date(TemporalFixtures::date(2025, 1, 1))
            .due_date(TemporalFixtures::date(2025, 1, 10))
            .build();
        let issued = h.issue(&h.draft_from(spec).await).await;

        h.set_today(TemporalFixtures::date(2025, 1, 7));
        let early = h.service.get_invoice(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(early.due.state, DueState::Upcoming);
        assert_eq!(early.due.days_remaining, Some(3));

        h.set_today(TemporalFixtures::date(2025, 1, 13));
        let late = h.service.get_invoice(h.issuer_id, issued.id).await.unwrap();
        assert_eq!(late.due.state, DueState::Overdue);
        assert_eq!(late.due.days_overdue, Some(3));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let h = TestHarness::new().await;
        let issued = h.issued().await;
        let draft = h.draft().await;
        let client = h.add_client().await;
        let overdue_spec = DraftSpecBuilder::customer(client)
            .issue_date(TemporalFixtures::date(2026, 1, 1))
            .due_date(TemporalFixtures::date(2026, 1, 31))
            .notes("Retainer January")
            .build();
        let overdue = h.issue(&h.draft_from(overdue_spec).await).await;

        let drafts = h
            .service
            .list_invoices(
                h.issuer_id,
                InvoiceFilter { query: InvoiceQuery::by_status(InvoiceStatus::Draft), due_state: None },
            )
            .await
            .unwrap();
        assert_eq!(drafts.iter().map(|v| v.invoice.id).collect::<Vec<_>>(), vec![draft.id]);

        let late = h
            .service
            .list_invoices(
                h.issuer_id,
                InvoiceFilter { query: InvoiceQuery::default(), due_state: Some(DueState::Overdue) },
            )
            .await
            .unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].invoice.id, overdue.id);

        let search = InvoiceQuery { search: Some("retainer".to_string()), ..Default::default() };
        let found = h
            .service
            .list_invoices(h.issuer_id, InvoiceFilter { query: search, due_state: None })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let by_number = InvoiceQuery { search: Some(issued.number.clone()), ..Default::default() };
        let found = h
            .service
            .list_invoices(h.issuer_id, InvoiceFilter { query: by_number, due_state: None })
            .await
            .unwrap();
        assert!(found.iter().any(|v| v.invoice.id == issued.id));

        let all = h.service.list_invoices(h.issuer_id, InvoiceFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all.last().map(|v| v.invoice.id), Some(overdue.id));
    }

    #[tokio::test]
    async fn test_receivables_summary() {
        let h = TestHarness::new().await;
        let open = h.issued().await;
        h.service
            .register_payment(h.issuer_id, open.id, NewPayment::new(eur(dec!(42)), PaymentMethod::Cash))
            .await
            .unwrap();

        let client = h.add_client().await;
        let late_spec = DraftSpecBuilder::customer(client)
            .issue_date(TemporalFixtures::date(2026, 1, 1))
            .due_date(TemporalFixtures::date(2026, 1, 31))
            .build();
        h.issue(&h.draft_from(late_spec).await).await;
        h.draft().await;

        let summary = h.service.summarize_receivables(h.issuer_id).await.unwrap();
        assert_eq!(summary.len(), 1);
        let eur_summary = &summary[0];
        assert_eq!(eur_summary.currency, Currency::EUR);
        assert_eq!(eur_summary.open_count, 2);
        assert_eq!(eur_summary.outstanding, dec!(442.00));
        assert_eq!(eur_summary.overdue_count, 1);
        assert_eq!(eur_summary.overdue_amount, dec!(242.00));
    }

    #[tokio::test]
    async fn test_receivables_ignore_provider_bills_and_credit_notes() {
        let h = TestHarness::new().await;
        let open = h.issued().await;

        let provider = CounterpartyFixtures::new_provider();
        h.add_counterparty(provider, CounterpartyFixtures::supplier()).await;
        let bill_spec = DraftSpecBuilder::vendor(Some(provider))
            .issue_date(TemporalFixtures::date(2026, 1, 1))
            .due_date(TemporalFixtures::date(2026, 1, 31))
            .build();
        let bill = h.issue(&h.draft_from(bill_spec).await).await;
        assert_eq!(bill.status, InvoiceStatus::Sent);

        let credit = h
            .service
            .create_rectification(h.issuer_id, open.id, "Wrong customer", RectificationType::Total)
            .await
            .unwrap();
        let credit = h.issue(&credit).await;
        assert!(credit.total < dec!(0));

        let summary = h.service.summarize_receivables(h.issuer_id).await.unwrap();
        assert_eq!(summary.len(), 1);
        let eur_summary = &summary[0];
        assert_eq!(eur_summary.open_count, 1);
        assert_eq!(eur_summary.outstanding, open.total);
        assert_eq!(eur_summary.overdue_count, 0);
        assert_eq!(eur_summary.overdue_amount, dec!(0));
    }
}
