//! Request middleware: issuer authentication and the access log

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use crate::auth::{validate_token, AuthError, Caller};
use crate::error::ApiError;
use crate::AppState;

/// Bearer credential from the `Authorization` header, scheme matched case-insensitively
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolves the calling issuer; every invoice route is scoped to it
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = bearer_token(request.headers())
        .ok_or(AuthError::InvalidToken)
        .and_then(|token| validate_token(token, &state.config.jwt_secret))
        .and_then(Caller::from_claims)
        .map_err(|e| {
            warn!(path = %request.uri().path(), error = %e, "Rejected unauthenticated request");
            ApiError::from(e)
        })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// One access-log line per request, tagged with the issuer it acted for
pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let issuer_id = request.extensions().get::<Caller>().map(|c| c.issuer_id);
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        %method,
        %path,
        issuer_id = ?issuer_id,
        request_id = request_id.as_deref().unwrap_or("-"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Invoicing API request"
    );
    response
}
