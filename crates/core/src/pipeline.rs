//! Pipeline identity types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One configured pipeline as currently known to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Storage identifier. Unique within one snapshot.
    pub id: i64,
    /// Externally visible name, used by the task for labels and locks.
    pub name: String,
    /// A paused pipeline is treated as if it did not exist.
    #[serde(default)]
    pub paused: bool,
}

impl Pipeline {
    /// Create an unpaused pipeline.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            paused: false,
        }
    }

    /// Set the paused flag.
    #[must_use]
    pub const fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Derive the running identity of this pipeline.
    #[must_use]
    pub fn key(&self) -> PipelineKey {
        PipelineKey::new(self.id, self.name.clone())
    }
}

/// Running identity of a pipeline.
///
/// Both the id and the name take part in equality: a rename produces a
/// different key, so the old task is stopped and a new one started rather
/// than mutating a live task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PipelineKey {
    pub id: i64,
    pub name: String,
}

impl PipelineKey {
    /// Create a key from its parts.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for PipelineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The global gate entity consulted before every pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateState {
    pub name: String,
    #[serde(default)]
    pub paused: bool,
}

impl GateState {
    /// An open (unpaused) gate.
    pub fn open(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paused: false,
        }
    }

    /// A closed (paused) gate.
    pub fn closed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paused: true,
        }
    }
}
