//! Prometheus metrics for the ranking and notification paths.
//!
//! Recording goes through the `metrics` facade (lock-free atomics), rendering goes
//! through a process-wide [`PrometheusHandle`]. The recorder is installed at most
//! once per process; later collectors share the same handle.
//!
//! | Series | Kind | Labels |
//! |--------|------|--------|
//! | `hotboard_votes_processed_total` | counter | |
//! | `hotboard_refresh_failures_total` | counter | `reason` |
//! | `hotboard_rebuilds_total` | counter | `outcome` |
//! | `hotboard_rebuild_duration_seconds` | histogram | |
//! | `hotboard_cache_requests_total` | counter | `result` |
//! | `hotboard_fallback_reads_total` | counter | `reason` |
//! | `hotboard_vote_events_dropped_total` | counter | |
//! | `hotboard_notifications_sent_total` | counter | `kind` |
//! | `hotboard_connections_dropped_total` | counter | `reason` |
//! | `hotboard_active_connections` | gauge | |

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::{Deserialize, Serialize};
use std::{sync::OnceLock, time::Duration};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Expose `/admin/metrics` (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: default_enabled() }
    }
}

fn init_prometheus_recorder() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "global metrics recorder already installed, using a detached recorder"
                );
                PrometheusBuilder::new().build_recorder().handle()
            }
        })
        .clone()
}

/// Cache lookup outcome, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
    Error,
}

impl CacheLookup {
    fn as_metric_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
        }
    }
}

pub struct MetricsCollector {
    prometheus_handle: PrometheusHandle,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self { prometheus_handle: init_prometheus_recorder() }
    }

    pub fn record_vote_processed(&self) {
        counter!("hotboard_votes_processed_total").increment(1);
    }

    /// `reason` is one of `store_unavailable`, `store_timeout`, `not_found`, `cache_write`.
    pub fn record_refresh_failure(&self, reason: &'static str) {
        counter!("hotboard_refresh_failures_total", "reason" => reason).increment(1);
    }

    pub fn record_rebuild(&self, success: bool, duration: Duration) {
        let outcome = if success { "success" } else { "abandoned" };
        counter!("hotboard_rebuilds_total", "outcome" => outcome).increment(1);
        histogram!("hotboard_rebuild_duration_seconds").record(duration.as_secs_f64());
    }

    pub fn record_cache_lookup(&self, lookup: CacheLookup) {
        counter!("hotboard_cache_requests_total", "result" => lookup.as_metric_str()).increment(1);
    }

    /// `reason` is `cache_unavailable` or `cold_start`.
    pub fn record_fallback_read(&self, reason: &'static str) {
        counter!("hotboard_fallback_reads_total", "reason" => reason).increment(1);
    }

    pub fn record_vote_event_dropped(&self) {
        counter!("hotboard_vote_events_dropped_total").increment(1);
    }

    pub fn record_notifications_sent(&self, kind: &'static str, delivered: usize) {
        counter!("hotboard_notifications_sent_total", "kind" => kind).increment(delivered as u64);
    }

    /// `reason` is `timeout`, `closed` or `not_open`.
    pub fn record_connection_dropped(&self, reason: &'static str) {
        counter!("hotboard_connections_dropped_total", "reason" => reason).increment(1);
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_active_connections(&self, count: usize) {
        gauge!("hotboard_active_connections").set(count as f64);
    }

    /// Prometheus text exposition of every recorded series.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus_handle.render()
    }
}
