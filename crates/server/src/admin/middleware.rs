//! Admin API authentication middleware.
//!
//! Validates `X-Admin-Token` with a constant-time comparison and, on success, places
//! a [`MaintenanceGrant`] in the request extensions for handlers that need one.
//!
//! - No token configured: every request is refused with `403 Forbidden`.
//! - Missing or wrong token: `401 Unauthorized`.

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use hotboard_core::cache::{AdminToken, MaintenanceGrant};
use tracing::warn;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

pub async fn admin_auth_middleware(
    State(admin_token): State<Option<AdminToken>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = admin_token else {
        warn!(path = %request.uri().path(), "admin request refused, no admin token configured");
        return Err(StatusCode::FORBIDDEN);
    };

    let presented = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let grant: MaintenanceGrant = expected.authorize(presented).ok_or_else(|| {
        warn!(path = %request.uri().path(), "admin request with invalid token");
        StatusCode::UNAUTHORIZED
    })?;

    request.extensions_mut().insert(grant);
    Ok(next.run(request).await)
}
