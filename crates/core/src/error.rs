//! Core error types for pipesync collaborators.
//!
//! Every collaborator of the syncer (pipeline sources, the pause gate, task
//! factories and the tasks themselves) reports failure through this type.
//! None of these errors are fatal to the syncer.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for pipesync operations.
#[derive(Debug, Error)]
pub enum Error {
    // Storage errors
    #[error("pipeline store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    // Task errors
    #[error("failed to construct task for pipeline '{pipeline}': {reason}")]
    TaskConstructionFailed { pipeline: String, reason: String },

    #[error("task failed: {reason}")]
    TaskFailed { reason: String },

    // Configuration errors
    #[error("failed to read config '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("config parse error: {reason}")]
    ConfigParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a store unavailable error.
    pub fn store_unavailable(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a task construction error.
    pub fn task_construction_failed(pipeline: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TaskConstructionFailed {
            pipeline: pipeline.into(),
            reason: reason.into(),
        }
    }

    /// Create a task failure error.
    pub fn task_failed(reason: impl Into<String>) -> Self {
        Self::TaskFailed {
            reason: reason.into(),
        }
    }

    /// Create a config read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a config parse error.
    pub fn config_parse_failed(reason: impl Into<String>) -> Self {
        Self::ConfigParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// The standard Result type for pipesync collaborators.
pub type Result<T> = std::result::Result<T, Error>;
