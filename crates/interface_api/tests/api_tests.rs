//! HTTP round trips over the in-memory adapters

use std::str::FromStr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use core_kernel::{HealthCheckable, IssuerId};
use domain_invoicing::Counterparty;
use interface_api::auth::{create_token, permissions};
use interface_api::config::ApiConfig;
use interface_api::{create_router, scheduler, AppState};
use test_utils::TestHarness;

const SECRET: &str = "api-test-secret";

struct TestApp {
    harness: TestHarness,
    router: Router,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let harness = TestHarness::new().await;
        let config = ApiConfig {
            jwt_secret: SECRET.to_string(),
            ..ApiConfig::default()
        };
        let health: Vec<Arc<dyn HealthCheckable>> = vec![harness.store.clone() as Arc<dyn HealthCheckable>];
        let state = AppState::new(harness.service.clone(), harness.reminders.clone(), config, health);
        let token = create_token(harness.issuer_id, vec!["admin".to_string()], SECRET, 300).unwrap();

        Self {
            router: create_router(state),
            harness,
            token,
        }
    }

    fn token_for(&self, issuer_id: IssuerId, roles: &[&str]) -> String {
        create_token(issuer_id, roles.iter().map(|r| r.to_string()).collect(), SECRET, 300).unwrap()
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call_as(&self.token, method, uri, body).await
    }

    async fn call_as(&self, token: &str, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token));
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        send(&self.router, request.body(body).unwrap()).await
    }

    async fn client_id(&self) -> String {
        match self.harness.add_client().await {
            Counterparty::Client(id) => id.as_uuid().to_string(),
            other => panic!("expected a client, got {:?}", other),
        }
    }

    async fn create_draft(&self) -> Value {
        let client_id = self.client_id().await;
        let (status, body) = self
            .call(Method::POST, "/api/v1/invoices", Some(draft_body(&client_id)))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn create_issued(&self) -> Value {
        let draft = self.create_draft().await;
        let (status, body) = self
            .call(Method::POST, &format!("/api/v1/invoices/{}/issue", uuid_of(&draft)), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn draft_body(client_id: &str) -> Value {
    json!({
        "invoice_type": "CUSTOMER",
        "client_id": client_id,
        "issue_date": "2026-03-02",
        "due_date": "2026-04-01",
        "currency": "EUR",
        "lines": [
            { "description": "Consulting hours", "quantity": "2", "unit_price": "100", "tax_percent": "21" }
        ]
    })
}

fn uuid_of(view: &Value) -> String {
    view["invoice"]["id"].as_str().unwrap().to_string()
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_readiness_reports_adapters() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/health/ready").body(Body::empty()).unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["adapters"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let request = Request::builder().uri("/api/v1/invoices").body(Body::empty()).unwrap();

    let (status, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_read_draft() {
    let app = TestApp::new().await;

    let created = app.create_draft().await;
    assert_eq!(created["invoice"]["status"], "DRAFT");
    assert_eq!(decimal(&created["invoice"]["total"]), dec!(242));

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/invoices/{}", uuid_of(&created)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["balance_due"]), dec!(242));
    assert_eq!(body["due"]["state"], "not_due");
}

#[tokio::test]
async fn test_invalid_draft_returns_details() {
    let app = TestApp::new().await;
    let client_id = app.client_id().await;
    let mut body = draft_body(&client_id);
    body["lines"][0]["tax_percent"] = json!("150");

    let (status, response) = app.call(Method::POST, "/api/v1/invoices", Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"], "validation_error");
    assert!(!response["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_line_is_rejected_without_crashing() {
    let app = TestApp::new().await;
    let mut body = draft_body(&app.client_id().await);
    body["lines"][0]["quantity"] = json!(Decimal::MAX.to_string());

    let (status, response) = app.call(Method::POST, "/api/v1/invoices", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"], "validation_error");

    // Each value fits on its own but their product does not
    let mut body = draft_body(&app.client_id().await);
    body["lines"][0]["quantity"] = json!("1000000000");
    body["lines"][0]["unit_price"] = json!("1000000000");
    let (status, response) = app.call(Method::POST, "/api/v1/invoices", Some(body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["details"], json!(["Line 1: amount out of range"]));
}

#[tokio::test]
async fn test_domain_validation_reaches_the_caller() {
    let app = TestApp::new().await;
    let mut body = draft_body(&app.client_id().await);
    body["due_date"] = json!("2026-02-01");

    let (status, response) = app.call(Method::POST, "/api/v1/invoices", Some(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["details"], json!(["Due date cannot be before the issue date"]));
}

#[tokio::test]
async fn test_issue_is_idempotent_over_http() {
    let app = TestApp::new().await;
    let draft = app.create_draft().await;
    let uri = format!("/api/v1/invoices/{}/issue", uuid_of(&draft));

    let (status, first) = app.call(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_issued"], false);
    assert_eq!(first["invoice"]["number"], "2026-0001");
    assert_eq!(first["invoice"]["status"], "SENT");

    let (status, second) = app.call(Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_issued"], true);
    assert_eq!(second["invoice"]["number"], "2026-0001");
}

#[tokio::test]
async fn test_payment_settles_and_cancel_is_then_refused() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;
    let id = uuid_of(&issued);

    let (status, paid) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{}/payments", id),
            Some(json!({ "amount": "242.00", "currency": "EUR", "method": "bank_transfer" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", paid);
    assert_eq!(paid["invoice"]["status"], "PAID");
    assert_eq!(decimal(&paid["balance_due"]), Decimal::ZERO);

    let (status, body) = app
        .call(Method::POST, &format!("/api/v1/invoices/{}/cancel", id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, events) = app
        .call(Method::GET, &format!("/api/v1/invoices/{}/events", id), None)
        .await;
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["CREATED", "SENT", "PAYMENT", "PAID"]);
}

#[tokio::test]
async fn test_zero_payment_is_rejected_before_the_service() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{}/payments", uuid_of(&issued)),
            Some(json!({ "amount": "0", "currency": "EUR", "method": "cash" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"], json!(["amount: must be greater than zero"]));
}

#[tokio::test]
async fn test_cancel_twice_reports_already_canceled() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;
    let uri = format!("/api/v1/invoices/{}/cancel", uuid_of(&issued));

    let (_, first) = app.call(Method::POST, &uri, None).await;
    let (status, second) = app.call(Method::POST, &uri, None).await;

    assert_eq!(first["already_canceled"], false);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_canceled"], true);
    assert_eq!(second["invoice"]["status"], "CANCELED");
}

#[tokio::test]
async fn test_unknown_and_foreign_invoices_are_not_found() {
    let app = TestApp::new().await;
    let draft = app.create_draft().await;

    let (status, _) = app
        .call(Method::GET, &format!("/api/v1/invoices/{}", uuid::Uuid::now_v7()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let stranger = app.token_for(IssuerId::new(), &["admin"]);
    let (status, _) = app
        .call_as(&stranger, Method::GET, &format!("/api/v1/invoices/{}", uuid_of(&draft)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_read_only_caller_cannot_issue() {
    let app = TestApp::new().await;
    let draft = app.create_draft().await;
    let reader = app.token_for(app.harness.issuer_id, &[permissions::INVOICE_READ]);

    let (status, _) = app
        .call_as(&reader, Method::POST, &format!("/api/v1/invoices/{}/issue", uuid_of(&draft)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call_as(&reader, Method::GET, &format!("/api/v1/invoices/{}/eligibility", uuid_of(&draft)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_and_delete_draft() {
    let app = TestApp::new().await;
    let draft = app.create_draft().await;
    let id = uuid_of(&draft);
    let client_id = draft["invoice"]["counterparty"]["id"].as_str().unwrap().to_string();

    let mut body = draft_body(&client_id);
    body["lines"][0]["quantity"] = json!("1");
    let (status, updated) = app
        .call(Method::PUT, &format!("/api/v1/invoices/{}", id), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(decimal(&updated["invoice"]["total"]), dec!(121));

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/invoices/{}", id), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, &format!("/api/v1/invoices/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rectification_round_trip() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;

    let (status, rect) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{}/rectifications", uuid_of(&issued)),
            Some(json!({ "reason": "Wrong quantity" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", rect);
    assert_eq!(rect["invoice"]["series"], "RECT");
    assert_eq!(rect["invoice"]["rectification"]["rectifies_number"], "2026-0001");
    assert_eq!(decimal(&rect["invoice"]["total"]), dec!(-242));

    let (status, list) = app
        .call(Method::GET, "/api/v1/invoices?rectifications_only=true", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_rectification_reason_is_rejected() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/v1/invoices/{}/rectifications", uuid_of(&issued)),
            Some(json!({ "reason": "", "kind": "PARTIAL" })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = TestApp::new().await;
    app.create_draft().await;
    app.create_issued().await;

    let (status, drafts) = app.call(Method::GET, "/api/v1/invoices?status=DRAFT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drafts.as_array().unwrap().len(), 1);

    let (_, all) = app.call(Method::GET, "/api/v1/invoices?limit=10", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = app.call(Method::GET, "/api/v1/invoices?limit=1000", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_summary_and_reminder_preview() {
    let app = TestApp::new().await;
    app.create_issued().await;

    let (status, summary) = app.call(Method::GET, "/api/v1/invoices/summary", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary[0]["currency"], "EUR");
    assert_eq!(decimal(&summary[0]["outstanding"]), dec!(242));

    let (status, reminders) = app
        .call(Method::GET, "/api/v1/invoices/reminders?date=2026-03-29", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reminders[0]["rule_key"], "before_3");
    assert!(app.harness.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_regenerate_document_returns_rendered_bytes() {
    let app = TestApp::new().await;
    let issued = app.create_issued().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/v1/invoices/{}/document", uuid_of(&issued)))
        .header(header::AUTHORIZATION, format!("Bearer {}", app.token))
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let document: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(document["number"], "2026-0001");
}

#[tokio::test]
async fn test_scheduled_sweep_sends_due_reminders() {
    let app = TestApp::new().await;
    app.create_issued().await;
    app.harness.set_today(test_utils::TemporalFixtures::date(2026, 4, 1));

    let report = scheduler::run_sweep_once(&app.harness.reminders).await.unwrap();

    assert_eq!(report.sent, 1);
    assert_eq!(app.harness.notifier.sent().await.len(), 1);
}
