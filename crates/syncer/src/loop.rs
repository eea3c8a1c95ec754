//! Continuous sync loop.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::syncer::Syncer;
use crate::types::SyncOutcome;

/// Drives `Syncer::sync` from a single interval so passes never overlap.
pub struct SyncLoop {
    /// The syncer.
    syncer: Arc<Syncer>,
    /// Stop signal receiver.
    stop_rx: watch::Receiver<bool>,
    /// Stop signal sender (for external control).
    stop_tx: watch::Sender<bool>,
}

/// Summary of a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Passes run, of any outcome.
    pub passes: usize,
    /// Passes skipped because of a gate or listing failure.
    pub skipped: usize,
    /// Tasks still registered when shutdown gave up.
    pub remaining_tasks: usize,
}

impl SyncLoop {
    /// Create a new sync loop.
    pub fn new(syncer: Arc<Syncer>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            syncer,
            stop_rx,
            stop_tx,
        }
    }

    /// Run until stopped, then shut the syncer down.
    ///
    /// Skipped passes never end the loop: the next tick simply retries.
    pub async fn run(&mut self) -> LoopStats {
        let config = self.syncer.config().clone();
        info!(
            interval_ms = config.interval.as_millis(),
            gate = %config.gate_name,
            "Starting sync loop"
        );

        let mut stats = LoopStats::default();
        let mut consecutive_skips = 0usize;
        let mut interval = tokio::time::interval(config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    stats.passes = stats.passes.saturating_add(1);
                    match self.syncer.sync().await {
                        SyncOutcome::Skipped(e) => {
                            stats.skipped = stats.skipped.saturating_add(1);
                            consecutive_skips = consecutive_skips.saturating_add(1);
                            if consecutive_skips == config.max_consecutive_skips {
                                error!(
                                    error = %e,
                                    consecutive = consecutive_skips,
                                    "Sync keeps skipping passes"
                                );
                            }
                        }
                        SyncOutcome::Suspended => {
                            consecutive_skips = 0;
                            debug!("Sync suspended");
                        }
                        SyncOutcome::Applied(report) => {
                            consecutive_skips = 0;
                            if !report.failed.is_empty() {
                                warn!(failed = report.failed.len(), "Some pipeline tasks could not be built");
                            }
                        }
                    }
                }
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        info!("Sync loop stopped");
                        break;
                    }
                }
            }
        }

        stats.remaining_tasks = self.syncer.shutdown().await;
        stats
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    #[must_use]
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }
}

/// Handle to stop a sync loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}
