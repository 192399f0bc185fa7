//! Background loop running synchronization attempts.

use crate::bootstrap::Bootstrapper;
use crate::error::SyncError;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

impl Bootstrapper {
    /// Catch up from storage, then run attempts until [`stop_sync`] is called.
    ///
    /// Returns `None` if a loop is already running.
    ///
    /// [`stop_sync`]: Bootstrapper::stop_sync
    pub fn start_sync(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let stop_rx = {
            let mut stop_tx = self.stop_tx.lock();
            if stop_tx.is_some() {
                debug!("sync loop already running");
                return None;
            }
            let (tx, rx) = oneshot::channel();
            *stop_tx = Some(tx);
            rx
        };

        if let Err(e) = self.sync_from_storage() {
            info!(error = %e, "storage bootstrap did not complete, syncing from network");
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            this.sync_blocks(stop_rx).await;
        }))
    }

    /// Deliver the stop signal to a running loop. Later calls do nothing.
    pub fn stop_sync(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(());
            info!("sync loop stop requested");
        }
    }

    async fn sync_blocks(&self, mut stop_rx: oneshot::Receiver<()>) {
        let sleep_time = self.config.sleep_time();
        info!(kind = %self.kind(), "sync loop started");

        loop {
            tokio::time::sleep(sleep_time).await;

            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Closed) => {
                    info!(kind = %self.kind(), "sync loop stopped");
                    return;
                }
                Err(TryRecvError::Empty) => {}
            }

            match self.sync_block().await {
                Ok(()) => {}
                Err(e) if e.is_timeout() => debug!(error = %e, "sync attempt timed out"),
                Err(e) => log_attempt_error(&e),
            }
        }
    }
}

fn log_attempt_error(e: &SyncError) {
    match e {
        SyncError::RollBackBehindFinalHeader { .. } | SyncError::HeaderNotFound { .. } => {
            debug!(error = %e, "sync attempt failed")
        }
        _ => warn!(error = %e, "sync attempt failed"),
    }
}
