//! Legal numbering: gapless, unique and atomic with issuance

use std::collections::HashSet;

use domain_invoicing::{InvoiceEventType, InvoiceStatus, InvoicingError, IssueOutcome, SeriesKey, DRAFT_NUMBER_PLACEHOLDER};
use test_utils::{
    assert_contiguous_from_one, count_events, CounterpartyFixtures, DraftSpecBuilder, TemporalFixtures,
    TestHarness,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance_is_gapless() {
    let h = TestHarness::new().await;
    let mut drafts = Vec::new();
    for _ in 0..20 {
        drafts.push(h.draft().await);
    }

    let handles: Vec<_> = drafts
        .iter()
        .map(|draft| {
            let service = h.service.clone();
            let issuer_id = h.issuer_id;
            let id = draft.id;
            tokio::spawn(async move { service.issue_invoice(issuer_id, id).await })
        })
        .collect();

    let mut sequences = Vec::new();
    let mut numbers = HashSet::new();
    for handle in handles {
        let issued = handle.await.unwrap().unwrap().into_invoice();
        sequences.push(issued.sequence.unwrap());
        numbers.insert(issued.number);
    }

    assert_eq!(numbers.len(), 20);
    assert_contiguous_from_one(sequences);
    assert_eq!(h.store.next_sequence(h.issuer_id, &SeriesKey::new("INV", 2026)).await, 21);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_issue_of_same_draft_allocates_once() {
    let h = TestHarness::new().await;
    let draft = h.draft().await;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let service = h.service.clone();
            let issuer_id = h.issuer_id;
            let id = draft.id;
            tokio::spawn(async move { service.issue_invoice(issuer_id, id).await })
        })
        .collect();

    let mut issued = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            IssueOutcome::Issued(invoice) => {
                issued += 1;
                assert_eq!(invoice.number, "2026-0001");
            }
            IssueOutcome::AlreadyIssued(invoice) => assert_eq!(invoice.number, "2026-0001"),
        }
    }

    assert_eq!(issued, 1);
    assert_eq!(h.store.next_sequence(h.issuer_id, &SeriesKey::new("INV", 2026)).await, 2);
    let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
    assert_eq!(count_events(&events, InvoiceEventType::Sent), 1);
}

#[tokio::test]
async fn test_failed_issuance_leaves_no_gap() {
    let h = TestHarness::new().await;
    let first = h.issued().await;
    assert_eq!(first.number, "2026-0001");

    let draft = h.draft().await;
    h.store.fail_next_issuance_write().await;
    let failed = h.service.issue_invoice(h.issuer_id, draft.id).await;
    assert!(matches!(failed, Err(InvoicingError::Allocation(_))));

    let unchanged = h.service.get_invoice(h.issuer_id, draft.id).await.unwrap().invoice;
    assert_eq!(unchanged.status, InvoiceStatus::Draft);
    assert_eq!(unchanged.number, DRAFT_NUMBER_PLACEHOLDER);
    assert!(unchanged.counterparty_snapshot.is_none());
    assert_eq!(h.store.next_sequence(h.issuer_id, &SeriesKey::new("INV", 2026)).await, 2);

    let events = h.service.list_invoice_events(h.issuer_id, draft.id).await.unwrap();
    assert_eq!(count_events(&events, InvoiceEventType::Sent), 0);

    let retried = h.issue(&draft).await;
    assert_eq!(retried.number, "2026-0002");
}

#[tokio::test]
async fn test_series_are_independent() {
    let h = TestHarness::new().await;
    let customer = h.issued().await;

    let provider = h
        .add_counterparty(CounterpartyFixtures::new_provider(), CounterpartyFixtures::supplier())
        .await;
    let vendor = h
        .issue(&h.draft_from(DraftSpecBuilder::vendor(Some(provider)).build()).await)
        .await;

    let client = h.add_client().await;
    let last_year = h
        .issue(
            &h.draft_from(
                DraftSpecBuilder::customer(client)
                    .issue_date(TemporalFixtures::date(2025, 12, 30))
                    .due_date(TemporalFixtures::date(2026, 1, 29))
                    .build(),
            )
            .await,
        )
        .await;

    assert_eq!((customer.series.as_str(), customer.number.as_str()), ("INV", "2026-0001"));
    assert_eq!((vendor.series.as_str(), vendor.number.as_str()), ("PRV", "2026-0001"));
    assert_eq!((last_year.series.as_str(), last_year.number.as_str()), ("INV", "2025-0001"));
}

#[tokio::test]
async fn test_backdated_draft_draws_from_the_year_of_its_issue_date() {
    let h = TestHarness::new().await;
    let client = h.add_client().await;
    let draft = h.draft_from(DraftSpecBuilder::customer(client).build()).await;

    let backdated = DraftSpecBuilder::customer(client)
        .issue_date(TemporalFixtures::date(2025, 12, 31))
        .due_date(TemporalFixtures::date(2026, 1, 30))
        .build();
    h.service.update_draft_invoice(h.issuer_id, draft.id, backdated).await.unwrap();

    let issued = h.issue(&draft).await;
    assert_eq!(issued.issue_date, TemporalFixtures::date(2025, 12, 31));
    assert_eq!(issued.number, "2025-0001");
    // The current year's counter is untouched
    assert_eq!(h.issued().await.number, "2026-0001");
}

#[tokio::test]
async fn test_issuers_have_separate_counters() {
    let a = TestHarness::new().await;
    let b = TestHarness::new().await;
    assert_eq!(a.issued().await.number, "2026-0001");
    assert_eq!(b.issued().await.number, "2026-0001");
    assert_eq!(a.issued().await.number, "2026-0002");
}

#[tokio::test]
async fn test_canceled_invoice_keeps_its_number() {
    let h = TestHarness::new().await;
    let first = h.issued().await;
    h.service.cancel_invoice(h.issuer_id, first.id).await.unwrap();

    let second = h.issued().await;
    assert_eq!(second.number, "2026-0002");

    let canceled = h.service.get_invoice(h.issuer_id, first.id).await.unwrap().invoice;
    assert_eq!(canceled.number, "2026-0001");
    assert_eq!(canceled.sequence, Some(1));
}

#[tokio::test]
async fn test_custom_series() {
    let h = TestHarness::new().await;
    let client = h.add_client().await;
    let draft = h.draft_from(DraftSpecBuilder::customer(client).series("EXP").build()).await;
    let issued = h.issue(&draft).await;

    assert_eq!(issued.series, "EXP");
    assert_eq!(issued.number, "2026-0001");
    assert_eq!(h.store.next_sequence(h.issuer_id, &SeriesKey::new("INV", 2026)).await, 1);
}
