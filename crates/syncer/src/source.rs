//! Collaborator seams: where desired state comes from, the pause gate,
//! and how tasks are built and run.

use async_trait::async_trait;
use pipesync_core::{GateState, Pipeline, Result};

use crate::signal::{ReadySignal, StopSignal};

/// Source of the full desired pipeline list.
#[async_trait]
pub trait PipelineSource: Send + Sync {
    /// Return a complete snapshot of configured pipelines.
    async fn list_all(&self) -> Result<Vec<Pipeline>>;
}

/// Global switch that can suspend all reconciliation.
#[async_trait]
pub trait PauseGate: Send + Sync {
    /// Look up a gate by name. `Ok(None)` means not found.
    async fn lookup(&self, name: &str) -> Result<Option<GateState>>;
}

/// A long-running unit of work supervised by the syncer.
#[async_trait]
pub trait PipelineTask: Send {
    /// Run until stopped or until the task decides to exit.
    ///
    /// Implementations should call `ready.notify()` once initialized and
    /// return promptly after `stop` fires. Returning `Ok(())` is a clean
    /// exit; an error is a failure. Either way the pipeline becomes
    /// eligible for a fresh start on the next pass.
    async fn run(self: Box<Self>, stop: StopSignal, ready: ReadySignal) -> Result<()>;
}

/// Builds a fresh, not yet started task for a pipeline.
///
/// Construction must not have side effects; the syncer starts the task
/// separately.
pub trait TaskFactory: Send + Sync {
    /// Build a task for `pipeline`.
    ///
    /// # Errors
    ///
    /// Returns an error when no task can be built for this pipeline. The
    /// syncer reports it and retries on the next pass.
    fn build(&self, pipeline: &Pipeline) -> Result<Box<dyn PipelineTask>>;
}

impl<F> TaskFactory for F
where
    F: Fn(&Pipeline) -> Result<Box<dyn PipelineTask>> + Send + Sync,
{
    fn build(&self, pipeline: &Pipeline) -> Result<Box<dyn PipelineTask>> {
        self(pipeline)
    }
}
