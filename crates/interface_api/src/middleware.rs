//! Request middleware
//!
//! Every `/api/v1` route sits behind two layers: a bearer-token gate that
//! resolves the acting landlord, and an audit log recording who touched
//! what.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};

use crate::auth::{self, Claims};
use crate::AppState;

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Rejects requests that do not carry a valid landlord token
///
/// On success the decoded [`Claims`] ride along in the request extensions
/// for the handlers and the audit layer.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(&request) else {
        warn!("request without a bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };
    let claims = auth::validate_token(token, &state.config.jwt_secret).map_err(|err| {
        warn!(error = %err, "bearer token rejected");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Writes one audit line per request, naming the acting landlord
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let landlord = request
        .extensions()
        .get::<Claims>()
        .map(|claims| claims.sub.clone());

    let started = Instant::now();
    let response = next.run(request).await;

    info!(
        %method,
        path,
        landlord = landlord.as_deref().unwrap_or("-"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "handled request"
    );
    response
}
