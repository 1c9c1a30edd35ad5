use crate::{
    cache::{AdminToken, RankCache},
    config::AppConfig,
    leaderboard::Leaderboard,
    metrics::MetricsCollector,
    notify::NotificationHub,
    refresher::RankRefresher,
    store::ScoreStore,
};
use std::sync::Arc;

/// Every long-lived service, shared by handle with request handlers.
#[derive(Clone)]
pub struct HotboardComponents {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ScoreStore>,
    pub cache: Arc<dyn RankCache>,
    pub hub: Arc<NotificationHub>,
    pub refresher: Arc<RankRefresher>,
    pub leaderboard: Arc<Leaderboard>,
    pub metrics: Arc<MetricsCollector>,
    /// `None` disables every privileged operation.
    pub admin_token: Option<AdminToken>,
}
