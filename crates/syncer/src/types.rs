//! Core types for a sync pass: desired state, actions, and results.

use std::collections::BTreeMap;

use itertools::Itertools;
use pipesync_core::{Pipeline, PipelineKey};
use serde::Serialize;

use crate::error::SyncError;
use crate::registry::RunningMap;

/// Desired state for one pass: unpaused pipelines keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct DesiredPipelines {
    pipelines: BTreeMap<PipelineKey, Pipeline>,
}

impl DesiredPipelines {
    /// Build from a full storage snapshot.
    ///
    /// Paused pipelines are dropped: for this pass they are the same as
    /// deleted ones.
    #[must_use]
    pub fn from_snapshot(snapshot: Vec<Pipeline>) -> Self {
        let pipelines = snapshot
            .into_iter()
            .filter(|pipeline| !pipeline.paused)
            .map(|pipeline| (pipeline.key(), pipeline))
            .collect();
        Self { pipelines }
    }

    /// Whether `key` should be running.
    #[must_use]
    pub fn contains(&self, key: &PipelineKey) -> bool {
        self.pipelines.contains_key(key)
    }

    /// Number of desired pipelines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Whether nothing should be running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.pipelines.values()
    }
}

/// One correction a pass makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Build and launch a task for a newly desired pipeline.
    Start(Pipeline),
    /// Ask a task whose key is no longer desired to stop.
    Stop(PipelineKey),
}

/// Compute the actions that bring `running` in line with `desired`.
///
/// Keys present on both sides produce nothing, even when the entry is
/// still shutting down from an earlier stop: its watcher removes it and a
/// later pass starts a fresh task.
pub(crate) fn diff(desired: &DesiredPipelines, running: &RunningMap) -> Vec<SyncAction> {
    let stops = running
        .keys()
        .filter(|key| !desired.contains(key))
        .sorted()
        .cloned()
        .map(SyncAction::Stop);

    let starts = desired
        .pipelines()
        .filter(|pipeline| !running.contains_key(&pipeline.key()))
        .cloned()
        .map(SyncAction::Start);

    stops.chain(starts).collect_vec()
}

/// What a pass that reached the registry did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Keys launched this pass.
    pub started: Vec<PipelineKey>,
    /// Keys newly asked to stop this pass.
    pub stopped: Vec<PipelineKey>,
    /// Keys whose task could not be built.
    pub failed: Vec<SyncError>,
    /// Registry size after the pass.
    pub running: usize,
    /// Whether the pass found nothing to change.
    pub converged: bool,
}

impl SyncReport {
    /// Create a report.
    #[must_use]
    pub fn new(
        started: Vec<PipelineKey>,
        stopped: Vec<PipelineKey>,
        failed: Vec<SyncError>,
        running: usize,
    ) -> Self {
        let converged = started.is_empty() && stopped.is_empty() && failed.is_empty();
        Self {
            started,
            stopped,
            failed,
            running,
            converged,
        }
    }
}

/// Result of one `sync()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The gate reported reconciliation suspended; nothing was touched.
    Suspended,
    /// The pass could not make progress; nothing was touched.
    Skipped(SyncError),
    /// The pass diffed and applied its actions.
    Applied(SyncReport),
}

impl SyncOutcome {
    /// The report, when the pass reached the registry.
    #[must_use]
    pub const fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Applied(report) => Some(report),
            Self::Suspended | Self::Skipped(_) => None,
        }
    }

    /// Whether the pass touched the registry.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}
