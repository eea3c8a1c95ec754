//! Bookkeeping of running pipeline tasks.
//!
//! One lock guards the whole map. Passes take it for the diff-and-apply
//! step; watchers take it to deregister their own entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use pipesync_core::{Pipeline, PipelineKey};
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard, Notify};
use ulid::Ulid;

use crate::signal::StopHandle;

/// A registered, launched task.
#[derive(Debug)]
pub struct RunningPipeline {
    /// The pipeline the task was built from.
    pub pipeline: Pipeline,
    /// Identifies this exact launch.
    pub run_id: Ulid,
    /// When the task was launched.
    pub started_at: DateTime<Utc>,
    stop: StopHandle,
}

impl RunningPipeline {
    pub(crate) fn new(pipeline: Pipeline, run_id: Ulid, stop: StopHandle) -> Self {
        Self {
            pipeline,
            run_id,
            started_at: Utc::now(),
            stop,
        }
    }

    /// Ask the task to stop. `true` if this was the first request.
    pub(crate) fn request_stop(&self) -> bool {
        self.stop.request()
    }

    /// Whether a stop was already requested.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.stop.is_requested()
    }

    fn summary(&self, key: &PipelineKey) -> RunningSummary {
        RunningSummary {
            key: key.clone(),
            run_id: self.run_id,
            started_at: self.started_at,
            stopping: self.is_stopping(),
        }
    }
}

/// Point-in-time view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunningSummary {
    pub key: PipelineKey,
    pub run_id: Ulid,
    pub started_at: DateTime<Utc>,
    pub stopping: bool,
}

pub(crate) type RunningMap = HashMap<PipelineKey, RunningPipeline>;

/// Registry of running tasks keyed by pipeline identity.
#[derive(Debug, Default)]
pub struct Registry {
    running: Mutex<RunningMap>,
    drained: Notify,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map for a read-modify-write.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, RunningMap> {
        self.running.lock().await
    }

    /// Remove `key` only if it still belongs to `run_id`.
    ///
    /// A newer launch under the same key is never removed by an older
    /// watcher. Returns whether an entry was removed.
    pub async fn deregister(&self, key: &PipelineKey, run_id: Ulid) -> bool {
        let removed = {
            let mut running = self.running.lock().await;
            let owned = running
                .get(key)
                .is_some_and(|entry| entry.run_id == run_id);
            if owned {
                running.remove(key);
            }
            owned
        };
        if removed {
            self.drained.notify_waiters();
        }
        removed
    }

    /// Request a stop on every entry.
    ///
    /// Returns the keys and run ids newly asked to stop; entries already
    /// stopping are skipped.
    pub async fn stop_all(&self) -> Vec<(PipelineKey, Ulid)> {
        let running = self.running.lock().await;
        running
            .iter()
            .filter(|(_, entry)| entry.request_stop())
            .map(|(key, entry)| (key.clone(), entry.run_id))
            .sorted()
            .collect_vec()
    }

    /// Wait until the registry is empty.
    pub async fn wait_drained(&self) {
        loop {
            // Register interest before checking so a removal in between
            // is not missed.
            let notified = self.drained.notified();
            if self.is_empty().await {
                return;
            }
            notified.await;
        }
    }

    /// Snapshot of all entries, ordered by key.
    pub async fn snapshot(&self) -> Vec<RunningSummary> {
        let running = self.running.lock().await;
        running
            .iter()
            .map(|(key, entry)| entry.summary(key))
            .sorted_by(|a, b| a.key.cmp(&b.key))
            .collect_vec()
    }

    /// Whether `key` has an entry.
    pub async fn contains(&self, key: &PipelineKey) -> bool {
        self.running.lock().await.contains_key(key)
    }

    /// Number of registered tasks.
    pub async fn len(&self) -> usize {
        self.running.lock().await.len()
    }

    /// Whether no tasks are registered.
    pub async fn is_empty(&self) -> bool {
        self.running.lock().await.is_empty()
    }
}
