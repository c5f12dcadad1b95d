//! Periodic studio directory refresh
//!
//! Runs as a background tokio task. Failures are logged by the store and
//! simply retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::Store;

/// How often the studio directory is reloaded
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

/// Handle for stopping the background refresh task
pub struct RefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Spawn the refresh loop. The first tick is skipped because the store
    /// has already loaded the directory during construction.
    pub fn spawn(store: Arc<Store>, every: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        debug!("scheduled studio directory refresh");
                        if let Some(studios) = store.update_studios().await {
                            debug!(count = studios.len(), "scheduled refresh done");
                        }
                        let purged = store.cache().purge_expired();
                        if purged > 0 {
                            debug!(purged, "dropped expired utilization entries");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("stopping studio directory refresh");
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, task }
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}
