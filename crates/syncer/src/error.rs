//! Non-fatal conditions surfaced by a sync pass.

use pipesync_core::PipelineKey;
use serde::Serialize;
use thiserror::Error;

/// Conditions a pass or a task can report.
///
/// None of these stop the syncer. A pass that hits `GateUnavailable` or
/// `ListingFailed` leaves the registry untouched; a `TaskFailed` key is
/// simply eligible for a fresh start on the next pass.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncError {
    /// Gate lookup failed or the gate does not exist.
    #[error("gate '{gate}' unavailable: {reason}")]
    GateUnavailable { gate: String, reason: String },

    /// The desired-state listing failed.
    #[error("listing pipelines failed: {reason}")]
    ListingFailed { reason: String },

    /// A task could not be built, or its run returned an error.
    #[error("task for pipeline '{key}' failed: {reason}")]
    TaskFailed { key: PipelineKey, reason: String },
}

impl SyncError {
    /// Create a gate unavailable error.
    pub fn gate_unavailable(gate: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GateUnavailable {
            gate: gate.into(),
            reason: reason.into(),
        }
    }

    /// Create a listing failed error.
    pub fn listing_failed(reason: impl Into<String>) -> Self {
        Self::ListingFailed {
            reason: reason.into(),
        }
    }

    /// Create a task failed error.
    pub fn task_failed(key: PipelineKey, reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            key,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyncError::gate_unavailable("scheduler", "not found");
        assert!(err.to_string().contains("scheduler"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_task_failed_names_key() {
        let err = SyncError::task_failed(PipelineKey::new(1, "pipeline"), "disaster");
        assert_eq!(
            err.to_string(),
            "task for pipeline 'pipeline#1' failed: disaster"
        );
    }
}
