//! Admin API.
//!
//! Served on its own listener so it can be bound to a private interface. Every
//! route, including the OpenAPI document, sits behind [`middleware::admin_auth_middleware`].

#![allow(clippy::needless_for_each)]

pub mod handlers;
pub mod middleware;
pub mod types;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use hotboard_core::runtime::HotboardComponents;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub components: HotboardComponents,

    /// Server start time for uptime reporting.
    pub start_time: Instant,

    pub version: &'static str,
}

impl AdminState {
    #[must_use]
    pub fn new(components: HotboardComponents) -> Self {
        Self { components, start_time: Instant::now(), version: env!("CARGO_PKG_VERSION") }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hotboard Admin API",
        version = "1.0.0",
        description = "Maintenance API for the hotboard ranking cache and notification hub"
    ),
    paths(
        handlers::cache::get_stats,
        handlers::cache::flush,
        handlers::cache::rebuild,
        handlers::notifications::get_stats,
        handlers::notifications::broadcast,
        handlers::metrics::get_metrics,
        handlers::system::get_status,
    ),
    components(schemas(
        types::AdminApiError,
        types::CacheStatsResponse,
        types::FlushResponse,
        types::RebuildResponse,
        types::NotificationStatsResponse,
        types::BroadcastRequest,
        types::BroadcastResponse,
        types::SystemStatus,
    )),
    tags(
        (name = "Cache", description = "Rank cache statistics and maintenance"),
        (name = "Notifications", description = "Live connection registry"),
        (name = "Metrics", description = "Prometheus metrics"),
        (name = "System", description = "Instance status")
    )
)]
pub struct ApiDoc;

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_admin_router(state: AdminState) -> Router {
    let admin_token = state.components.admin_token.clone();
    let (set_request_id, propagate_request_id) = crate::middleware::create_request_id_layers();

    Router::new()
        .route("/admin/cache/stats", get(handlers::cache::get_stats))
        .route("/admin/cache/flush", post(handlers::cache::flush))
        .route("/admin/cache/rebuild", post(handlers::cache::rebuild))
        .route("/admin/notifications/stats", get(handlers::notifications::get_stats))
        .route("/admin/notifications/broadcast", post(handlers::notifications::broadcast))
        .route("/admin/metrics", get(handlers::metrics::get_metrics))
        .route("/admin/system/status", get(handlers::system::get_status))
        .route("/admin/openapi.json", get(openapi))
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(admin_token, middleware::admin_auth_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(crate::middleware::request_span::<axum::body::Body>),
        )
        .layer(propagate_request_id)
        .layer(set_request_id)
}
