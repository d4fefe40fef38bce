//! Position tracker
//!
//! Polls the live audio handle on a fixed interval and republishes its
//! status into the engine's status channel. The hardware's own callback
//! stream feeds the same channel; both sources report absolute values, so
//! the consumer simply lets the last writer win.

use crate::output::{AudioHandle, ResourceStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Interval poll of a resource's time-based status
///
/// `start` and `stop` are idempotent. Poll failures are swallowed: a
/// stop/reload race during track transitions is expected, not an error.
pub(crate) struct PositionTracker {
    interval: Duration,
    updates: mpsc::Sender<ResourceStatus>,
    task: Option<JoinHandle<()>>,
}

impl PositionTracker {
    pub fn new(interval: Duration, updates: mpsc::Sender<ResourceStatus>) -> Self {
        Self {
            interval,
            updates,
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Begin polling the given handle; no-op if already running
    pub fn start(&mut self, handle: Arc<dyn AudioHandle>) {
        if self.is_running() {
            return;
        }

        let interval = self.interval;
        let updates = self.updates.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so polls align to the interval
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match handle.status().await {
                    Ok(status) if status.is_loaded => {
                        if updates.send(status).await.is_err() {
                            break;
                        }
                    }
                    // Unloaded or failed mid-poll: expected during transitions
                    _ => {}
                }
            }
        }));
    }

    /// Cancel the poll; no-op if not running
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
