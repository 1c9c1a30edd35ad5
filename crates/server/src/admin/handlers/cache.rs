//! Cache maintenance handlers.

#![allow(clippy::cast_precision_loss)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use hotboard_core::cache::MaintenanceGrant;
use tracing::{info, warn};

use crate::admin::{
    types::{AdminApiError, CacheStatsResponse, FlushResponse, RebuildResponse},
    AdminState,
};

fn calculate_hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total > 0 {
        (hits as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// GET /admin/cache/stats
#[utoipa::path(
    get,
    path = "/admin/cache/stats",
    tag = "Cache",
    responses(
        (status = 200, description = "Current cache statistics", body = CacheStatsResponse),
        (status = 503, description = "Cache unreachable", body = AdminApiError)
    )
)]
pub async fn get_stats(State(state): State<AdminState>) -> impl IntoResponse {
    match state.components.cache.stats().await {
        Ok(stats) => Json(CacheStatsResponse {
            hit_rate: calculate_hit_rate(stats.hits, stats.misses),
            backend: stats.backend,
            aggregate_entries: stats.aggregate_entries,
            hot_list_len: stats.hot_list_len,
            hot_list_version: stats.hot_list_version,
            most_voted_list_len: stats.most_voted_list_len,
            most_voted_list_version: stats.most_voted_list_version,
            hits: stats.hits,
            misses: stats.misses,
        })
        .into_response(),
        Err(e) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(AdminApiError::new(e.to_string()))).into_response()
        }
    }
}

/// POST /admin/cache/flush
///
/// Drops every cached aggregate and both published rankings. The next read
/// rebuilds them from the store.
#[utoipa::path(
    post,
    path = "/admin/cache/flush",
    tag = "Cache",
    responses(
        (status = 200, description = "Cache flushed", body = FlushResponse),
        (status = 503, description = "Cache unreachable", body = AdminApiError)
    )
)]
pub async fn flush(
    State(state): State<AdminState>,
    Extension(grant): Extension<MaintenanceGrant>,
) -> impl IntoResponse {
    let backend = state.components.cache.backend();
    match state.components.cache.flush(&grant).await {
        Ok(()) => {
            info!(backend, "rank cache flushed by admin");
            Json(FlushResponse { flushed: true, backend: backend.to_string() }).into_response()
        }
        Err(e) => {
            warn!(backend, error = %e, "admin cache flush failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(AdminApiError::new(e.to_string()))).into_response()
        }
    }
}

/// POST /admin/cache/rebuild
#[utoipa::path(
    post,
    path = "/admin/cache/rebuild",
    tag = "Cache",
    responses(
        (status = 200, description = "Rankings rebuilt and published", body = RebuildResponse),
        (status = 503, description = "Score store unreachable", body = AdminApiError)
    )
)]
pub async fn rebuild(State(state): State<AdminState>) -> impl IntoResponse {
    let top_n = state.components.refresher.top_n();
    match state.components.refresher.rebuild_top_list(top_n).await {
        Ok(rankings) => Json(RebuildResponse {
            candidates: rankings.aggregates.len(),
            hot: rankings.hot.iter().map(|id| id.get()).collect(),
            most_voted: rankings.most_voted.iter().map(|id| id.get()).collect(),
            computed_at: rankings.computed_at,
        })
        .into_response(),
        Err(e) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(AdminApiError::new(e.to_string()))).into_response()
        }
    }
}
