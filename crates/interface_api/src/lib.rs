//! HTTP API Layer
//!
//! REST surface of the invoicing engine, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one per lifecycle operation, all scoped to the issuer in
//!   the caller's token
//! - **Middleware**: authentication, audit logging, request ids
//! - **DTOs**: request validation and response shapes
//! - **Scheduler**: the periodic reminder sweep
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod scheduler;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{Clock, HealthCheckable, SystemClock};
use domain_invoicing::{DocumentPipeline, InvoiceService, JsonDocumentRenderer, ReminderService};
use infra_db::{
    PostgresBrandingProvider, PostgresCounterpartyDirectory, PostgresDocumentStore, PostgresInvoiceStore,
    PostgresNotificationOutbox,
};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handlers::{health, invoices};
use crate::middleware::{access_log, authenticate};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InvoiceService>,
    pub reminders: Arc<ReminderService>,
    pub config: ApiConfig,
    /// Adapters probed by the readiness check
    pub health: Arc<Vec<Arc<dyn HealthCheckable>>>,
}

impl AppState {
    pub fn new(
        service: Arc<InvoiceService>,
        reminders: Arc<ReminderService>,
        config: ApiConfig,
        health: Vec<Arc<dyn HealthCheckable>>,
    ) -> Self {
        Self {
            service,
            reminders,
            config,
            health: Arc::new(health),
        }
    }

    /// Wires both services over the PostgreSQL adapters
    pub fn postgres(pool: PgPool, config: ApiConfig) -> Result<Self, ApiError> {
        let settings = config.invoicing_settings()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store = Arc::new(PostgresInvoiceStore::new(pool.clone()));
        let directory = Arc::new(PostgresCounterpartyDirectory::new(pool.clone()));
        let branding = Arc::new(PostgresBrandingProvider::new(pool.clone()));
        let outbox = Arc::new(PostgresNotificationOutbox::new(pool.clone()));
        let pipeline = DocumentPipeline::new(
            Arc::new(JsonDocumentRenderer),
            Arc::new(PostgresDocumentStore::new(pool)),
            clock.clone(),
        );

        let reminders = Arc::new(ReminderService::new(
            store.clone(),
            store.clone(),
            outbox,
            directory.clone(),
            clock.clone(),
            settings.timezone,
            settings.reminder_rules.clone(),
        ));
        let service = Arc::new(InvoiceService::new(
            store.clone(),
            directory.clone(),
            branding,
            pipeline,
            clock,
            settings,
        ));

        let health: Vec<Arc<dyn HealthCheckable>> = vec![
            store as Arc<dyn HealthCheckable>,
            directory as Arc<dyn HealthCheckable>,
        ];
        Ok(Self::new(service, reminders, config, health))
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let invoice_routes = Router::new()
        .route("/", post(invoices::create_invoice).get(invoices::list_invoices))
        .route("/summary", get(invoices::summarize_receivables))
        .route("/reminders", get(invoices::reminders_for_date))
        .route(
            "/:id",
            get(invoices::get_invoice)
                .put(invoices::update_invoice)
                .delete(invoices::delete_invoice),
        )
        .route("/:id/eligibility", get(invoices::issue_eligibility))
        .route("/:id/issue", post(invoices::issue_invoice))
        .route("/:id/cancel", post(invoices::cancel_invoice))
        .route("/:id/view", post(invoices::record_view))
        .route("/:id/payments", post(invoices::register_payment))
        .route("/:id/rectifications", post(invoices::create_rectification))
        .route("/:id/events", get(invoices::list_events))
        .route("/:id/document", post(invoices::regenerate_document));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .layer(axum_middleware::from_fn(access_log))
        .layer(axum_middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
