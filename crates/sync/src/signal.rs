//! Single-slot notification with a deadline.
//!
//! A [`Signal`] holds at most one pending pulse. Pulses carry no data, so a
//! pulse arriving while one is pending is dropped. Callers drain stale pulses
//! before issuing the request they are about to wait for.

use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Binary semaphore bound to a wait deadline.
#[derive(Debug)]
pub struct Signal {
    tx: mpsc::Sender<()>,
    rx: Mutex<mpsc::Receiver<()>>,
}

impl Signal {
    /// Create a signal with no pending pulse.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Raise the signal. Never blocks.
    pub fn pulse(&self) {
        // Full means a pulse is already pending.
        let _ = self.tx.try_send(());
    }

    /// Discard a pending pulse. Returns true if one was pending.
    ///
    /// No-op while a waiter is blocked on the signal.
    pub fn drain(&self) -> bool {
        let Ok(mut rx) = self.rx.try_lock() else {
            return false;
        };
        let mut drained = false;
        while rx.try_recv().is_ok() {
            drained = true;
        }
        drained
    }

    /// Wait up to `timeout` for a pulse. Returns false on timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let mut rx = self.rx.lock().await;
        matches!(tokio::time::timeout(timeout, rx.recv()).await, Ok(Some(())))
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_pulse() {
        let signal = Signal::new();
        assert!(!signal.wait(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_pulse_before_wait_is_kept() {
        let signal = Signal::new();
        signal.pulse();
        signal.pulse();
        assert!(signal.wait(Duration::from_millis(10)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_discards_stale_pulse() {
        let signal = Signal::new();
        signal.pulse();
        assert!(signal.drain());
        assert!(!signal.drain());
        assert!(!signal.wait(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn test_pulse_wakes_waiter() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            tokio::spawn(async move { signal.wait(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        signal.pulse();
        assert!(waiter.await.unwrap());
    }
}
