//! Invoice handlers
//!
//! Every handler acts for the issuer resolved from the caller's token; an
//! invoice of another issuer is indistinguishable from a missing one.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use core_kernel::InvoiceId;
use domain_invoicing::{
    CancelOutcome, InvoiceEvent, InvoiceView, IssueEligibility, IssueOutcome, ReceivablesSummary,
    ReminderCandidate,
};

use crate::auth::{permissions, Caller};
use crate::dto::invoices::*;
use crate::{error::ApiError, AppState};

fn validated<T: Validate>(request: T) -> Result<T, ApiError> {
    request.validate()?;
    Ok(request)
}

/// Creates a draft invoice
pub async fn create_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<DraftRequest>,
) -> Result<(StatusCode, Json<InvoiceView>), ApiError> {
    caller.require(permissions::INVOICE_WRITE)?;
    let spec = validated(request)?.into_spec()?;

    let invoice = state.service.create_invoice(caller.issuer_id, spec).await?;
    Ok((StatusCode::CREATED, Json(state.service.view_of(invoice)?)))
}

/// Lists invoices, newest issue date first
pub async fn list_invoices(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<ListInvoicesParams>,
) -> Result<Json<Vec<InvoiceView>>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    let filter = validated(params)?.into_filter()?;

    Ok(Json(state.service.list_invoices(caller.issuer_id, filter).await?))
}

/// Receivables per currency
pub async fn summarize_receivables(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<ReceivablesSummary>>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    Ok(Json(state.service.summarize_receivables(caller.issuer_id).await?))
}

/// Reminders that fire on the given date; nothing is sent
pub async fn reminders_for_date(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<RemindersParams>,
) -> Result<Json<Vec<ReminderCandidate>>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    Ok(Json(
        state
            .service
            .get_invoice_reminders_for_date(caller.issuer_id, params.date)
            .await?,
    ))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceView>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    Ok(Json(state.service.get_invoice(caller.issuer_id, InvoiceId::from_uuid(id)).await?))
}

/// Replaces the content of a draft
pub async fn update_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(request): Json<DraftRequest>,
) -> Result<Json<InvoiceView>, ApiError> {
    caller.require(permissions::INVOICE_WRITE)?;
    let spec = validated(request)?.into_spec()?;

    let invoice = state
        .service
        .update_draft_invoice(caller.issuer_id, InvoiceId::from_uuid(id), spec)
        .await?;
    Ok(Json(state.service.view_of(invoice)?))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.require(permissions::INVOICE_WRITE)?;
    state
        .service
        .delete_draft_invoice(caller.issuer_id, InvoiceId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn issue_eligibility(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<IssueEligibility>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    Ok(Json(
        state
            .service
            .get_issue_eligibility(caller.issuer_id, InvoiceId::from_uuid(id))
            .await?,
    ))
}

/// Assigns the legal number; repeating the call is a no-op
pub async fn issue_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<IssueResponse>, ApiError> {
    caller.require(permissions::INVOICE_ISSUE)?;
    let outcome = state
        .service
        .issue_invoice(caller.issuer_id, InvoiceId::from_uuid(id))
        .await?;
    let already_issued = matches!(outcome, IssueOutcome::AlreadyIssued(_));

    Ok(Json(IssueResponse {
        already_issued,
        view: state.service.view_of(outcome.into_invoice())?,
    }))
}

pub async fn cancel_invoice(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    caller.require(permissions::INVOICE_ISSUE)?;
    let outcome = state
        .service
        .cancel_invoice(caller.issuer_id, InvoiceId::from_uuid(id))
        .await?;
    let already_canceled = matches!(outcome, CancelOutcome::AlreadyCancelled(_));

    Ok(Json(CancelResponse {
        already_canceled,
        view: state.service.view_of(outcome.invoice().clone())?,
    }))
}

/// Records that the counterparty opened the invoice
pub async fn record_view(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceView>, ApiError> {
    caller.require(permissions::INVOICE_WRITE)?;
    let invoice = state
        .service
        .record_view(caller.issuer_id, InvoiceId::from_uuid(id))
        .await?;
    Ok(Json(state.service.view_of(invoice)?))
}

pub async fn register_payment(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(request): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<InvoiceView>), ApiError> {
    caller.require(permissions::PAYMENT_WRITE)?;
    let payment = validated(request)?.into();

    let invoice = state
        .service
        .register_payment(caller.issuer_id, InvoiceId::from_uuid(id), payment)
        .await?;
    Ok((StatusCode::CREATED, Json(state.service.view_of(invoice)?)))
}

/// Creates a corrective draft linked to the invoice
pub async fn create_rectification(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(request): Json<RectificationRequest>,
) -> Result<(StatusCode, Json<InvoiceView>), ApiError> {
    caller.require(permissions::INVOICE_ISSUE)?;
    let request = validated(request)?;

    let draft = state
        .service
        .create_rectification(caller.issuer_id, InvoiceId::from_uuid(id), &request.reason, request.kind)
        .await?;
    Ok((StatusCode::CREATED, Json(state.service.view_of(draft)?)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<InvoiceEvent>>, ApiError> {
    caller.require(permissions::INVOICE_READ)?;
    Ok(Json(
        state
            .service
            .list_invoice_events(caller.issuer_id, InvoiceId::from_uuid(id))
            .await?,
    ))
}

/// Renders the document again and returns it
pub async fn regenerate_document(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    caller.require(permissions::INVOICE_WRITE)?;
    let document = state
        .service
        .regenerate_document(caller.issuer_id, InvoiceId::from_uuid(id))
        .await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, document.content_type)],
        document.content,
    )
        .into_response())
}
