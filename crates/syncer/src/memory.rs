//! In-memory pipeline store, for embedding and tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pipesync_core::{Error, GateState, Pipeline, Result};
use tokio::sync::RwLock;

use crate::source::{PauseGate, PipelineSource};

#[derive(Debug, Default)]
struct StoreState {
    pipelines: Vec<Pipeline>,
    gate: Option<GateState>,
    listing_failure: Option<String>,
    gate_failure: Option<String>,
}

/// Simple in-memory pipeline source and pause gate.
///
/// Starts with no gate, so a syncer built on a fresh store skips every
/// pass until [`InMemoryPipelineStore::set_gate`] is called.
#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    state: RwLock<StoreState>,
    list_calls: AtomicUsize,
}

impl InMemoryPipelineStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `pipelines`.
    #[must_use]
    pub fn with_pipelines(pipelines: Vec<Pipeline>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                pipelines,
                ..StoreState::default()
            }),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Replace the pipeline list.
    pub async fn set_pipelines(&self, pipelines: Vec<Pipeline>) {
        self.state.write().await.pipelines = pipelines;
    }

    /// Modify the pipeline list in place.
    pub async fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<Pipeline>),
    {
        let mut state = self.state.write().await;
        f(&mut state.pipelines);
    }

    /// Set or remove the gate entity.
    pub async fn set_gate(&self, gate: Option<GateState>) {
        self.state.write().await.gate = gate;
    }

    /// Make `list_all` fail with `reason`, or succeed again with `None`.
    pub async fn fail_listing(&self, reason: Option<String>) {
        self.state.write().await.listing_failure = reason;
    }

    /// Make `lookup` fail with `reason`, or succeed again with `None`.
    pub async fn fail_gate(&self, reason: Option<String>) {
        self.state.write().await.gate_failure = reason;
    }

    /// How many times `list_all` has been called.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PipelineSource for InMemoryPipelineStore {
    async fn list_all(&self) -> Result<Vec<Pipeline>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        match &state.listing_failure {
            Some(reason) => Err(Error::store_unavailable(reason.clone())),
            None => Ok(state.pipelines.clone()),
        }
    }
}

#[async_trait]
impl PauseGate for InMemoryPipelineStore {
    async fn lookup(&self, name: &str) -> Result<Option<GateState>> {
        let state = self.state.read().await;
        if let Some(reason) = &state.gate_failure {
            return Err(Error::store_unavailable(reason.clone()));
        }
        Ok(state.gate.as_ref().filter(|gate| gate.name == name).cloned())
    }
}
