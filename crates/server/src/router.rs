//! Public gallery API.

use crate::{middleware, ws};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hotboard_core::{
    leaderboard::LeaderboardError,
    runtime::HotboardComponents,
    store::StoreError,
    types::{RankedResponse, RankingKind, ResponseAggregate, ResponseId},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, warn};

/// Errors surfaced to HTTP callers.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    Internal(String),
}

impl From<LeaderboardError> for ApiError {
    fn from(err: LeaderboardError) -> Self {
        match err {
            LeaderboardError::ResponseNotFound(id) => Self::NotFound(format!("response {id} not found")),
            LeaderboardError::Store(e @ (StoreError::Unavailable(_) | StoreError::Timeout(_))) => {
                Self::Unavailable(e.to_string())
            }
            LeaderboardError::Store(e) => Self::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            Self::NotFound(m) => (StatusCode::NOT_FOUND, m),
            Self::Unavailable(m) => {
                warn!(error = %m, "request failed, score store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, m)
            }
            Self::Internal(m) => {
                warn!(error = %m, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
    pub ranking: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteAccepted {
    pub response_id: ResponseId,
    /// `false` when the event queue was full; a full rebuild was requested instead.
    pub queued: bool,
}

/// GET /gallery/top
pub async fn handle_top(
    State(components): State<HotboardComponents>,
    Query(query): Query<TopQuery>,
) -> Result<Json<Vec<RankedResponse>>, ApiError> {
    let kind = match query.ranking.as_deref() {
        Some(raw) => raw.parse::<RankingKind>().map_err(ApiError::BadRequest)?,
        None => components.config.ranking.default_kind,
    };
    let limit = query.limit.unwrap_or(components.config.ranking.top_n);
    let rows = components.leaderboard.get_top_responses(kind, limit).await?;
    Ok(Json(rows))
}

/// GET /responses/{id}/score
pub async fn handle_score(
    State(components): State<HotboardComponents>,
    Path(response_id): Path<i64>,
) -> Result<Json<ResponseAggregate>, ApiError> {
    let aggregate = components.leaderboard.get_aggregate(ResponseId(response_id)).await?;
    Ok(Json(aggregate))
}

/// POST /votes/{response_id}/recorded
///
/// Called by the voting service after it has committed a vote row.
pub async fn handle_vote_recorded(
    State(components): State<HotboardComponents>,
    Path(response_id): Path<i64>,
) -> (StatusCode, Json<VoteAccepted>) {
    let response_id = ResponseId(response_id);
    let queued = components.refresher.notify_vote_recorded(response_id);
    debug!(response_id = %response_id, queued, "vote event accepted");
    (StatusCode::ACCEPTED, Json(VoteAccepted { response_id, queued }))
}

pub async fn handle_health() -> &'static str {
    "ok"
}

/// Builds the public router with tracing, request ids, a body limit and the
/// configured request timeout.
pub fn create_public_router(components: HotboardComponents) -> Router {
    let (set_request_id, propagate_request_id) = middleware::create_request_id_layers();
    let request_timeout = components.config.request_timeout();

    let api = Router::new()
        .route("/gallery/top", get(handle_top))
        .route("/responses/{id}/score", get(handle_score))
        .route("/votes/{response_id}/recorded", post(handle_vote_recorded))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(16 * 1024));

    Router::new()
        .route("/health", get(handle_health))
        .route("/ws/{subscriber_id}", get(ws::handle_ws))
        .merge(api)
        .with_state(components)
        .layer(TraceLayer::new_for_http().make_span_with(middleware::request_span::<axum::body::Body>))
        .layer(propagate_request_id)
        .layer(set_request_id)
}
