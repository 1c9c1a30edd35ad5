//! Runtime lifecycle: background workers and graceful shutdown.

use crate::config::AppConfig;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};

use super::{builder::HotboardRuntimeBuilder, HotboardComponents};

const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns every component plus the refresher workers.
///
/// `shutdown()` broadcasts the stop signal, closes live connections and waits
/// for the workers to finish.
pub struct HotboardRuntime {
    components: HotboardComponents,
    shutdown_tx: broadcast::Sender<()>,
    workers: Vec<JoinHandle<()>>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl HotboardRuntime {
    #[must_use]
    pub fn builder() -> HotboardRuntimeBuilder {
        HotboardRuntimeBuilder::new()
    }

    pub(super) fn new(
        components: HotboardComponents,
        shutdown_tx: broadcast::Sender<()>,
        start_workers: bool,
    ) -> Self {
        let workers = if start_workers {
            let handles = components.refresher.start(&shutdown_tx);
            debug!(workers = handles.len(), "refresher workers started");
            handles
        } else {
            Vec::new()
        };

        Self { components, shutdown_tx, workers, shutdown_initiated: Arc::new(AtomicBool::new(false)) }
    }

    #[must_use]
    pub fn components(&self) -> &HotboardComponents {
        &self.components
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.components.config
    }

    /// Subscribes to the shutdown signal, e.g. for HTTP servers' graceful shutdown.
    #[must_use]
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// A sender that triggers shutdown from outside the runtime (signal handlers).
    #[must_use]
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Signals every worker, closes live connections and waits for the workers.
    /// Workers that overrun the timeout are aborted.
    pub async fn shutdown(self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("shutdown already initiated, ignoring duplicate call");
            return;
        }

        info!("initiating hotboard runtime shutdown");
        if let Err(e) = self.shutdown_tx.send(()) {
            debug!(error = %e, "shutdown signal had no receivers");
        }
        self.components.hub.close_all();

        for worker in self.workers {
            let abort = worker.abort_handle();
            match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) if e.is_cancelled() => debug!("worker cancelled"),
                Ok(Err(e)) => error!(error = %e, "worker failed during shutdown"),
                Err(_) => {
                    warn!(timeout_s = WORKER_SHUTDOWN_TIMEOUT.as_secs(), "worker overran shutdown, aborting");
                    abort.abort();
                }
            }
        }

        info!("hotboard runtime shutdown complete");
    }

    /// Waits for a shutdown signal from any sender, then shuts down.
    pub async fn wait_for_shutdown(self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let _ = shutdown_rx.recv().await;
        info!("shutdown signal received, runtime terminating");
        self.shutdown().await;
    }
}
