//! Keeps one supervised task per configured pipeline.
//!
//! The syncer reconciles a stored list of pipelines against the set of
//! tasks it is running:
//!
//! - **Gate**: a single well-known gate can suspend every pass
//! - **Desired State**: the full pipeline list, minus paused pipelines
//! - **Identity**: a pipeline's `(id, name)` key; a rename is a new key
//! - **Diff**: stop tasks whose key is gone, start tasks for new keys
//!
//! # Key Concepts
//!
//! ## Passes
//!
//! [`Syncer::sync`] runs one pass and returns a [`SyncOutcome`]. A pass
//! never waits for a task to start or stop. Gate and listing failures skip
//! the pass without touching running tasks.
//!
//! ## Watchers
//!
//! Every launched task gets a watcher that deregisters it when its run
//! returns, cleanly or not. The next pass restarts it if it is still
//! desired. A pass only requests stops; it never removes entries.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use pipesync::{
//!     GateState, InMemoryPipelineStore, Pipeline, PipelineTask, ReadySignal, StopSignal,
//!     SyncLoop, SyncerBuilder, TaskFactory,
//! };
//!
//! struct IdleTask;
//!
//! #[async_trait]
//! impl PipelineTask for IdleTask {
//!     async fn run(self: Box<Self>, mut stop: StopSignal, ready: ReadySignal) -> pipesync::Result<()> {
//!         ready.notify();
//!         stop.recv().await;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> pipesync::Result<()> {
//!     let store = Arc::new(InMemoryPipelineStore::with_pipelines(vec![Pipeline::new(
//!         1, "pipeline",
//!     )]));
//!     store.set_gate(Some(GateState::open("scheduler"))).await;
//!
//!     let factory: Arc<dyn TaskFactory> =
//!         Arc::new(|_: &Pipeline| -> pipesync::Result<Box<dyn PipelineTask>> {
//!             Ok(Box::new(IdleTask))
//!         });
//!     let syncer = Arc::new(
//!         SyncerBuilder::new()
//!             .with_store(store)
//!             .with_factory(factory)
//!             .build()?,
//!     );
//!
//!     let mut sync_loop = SyncLoop::new(syncer);
//!     let stopper = sync_loop.stopper();
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         stopper.stop();
//!     });
//!     sync_loop.run().await;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod events;
pub mod r#loop;
pub mod manifest;
pub mod memory;
pub mod registry;
pub mod signal;
pub mod source;
pub mod syncer;
pub mod types;

// Re-export main types
pub use config::SyncerConfig;
pub use error::SyncError;
pub use events::{EventPublisher, SyncEvent};
pub use r#loop::{LoopStats, LoopStopper, SyncLoop};
pub use manifest::{Manifest, ManifestStore};
pub use memory::InMemoryPipelineStore;
pub use registry::{Registry, RunningSummary};
pub use signal::{ReadySignal, StopHandle, StopSignal, ready_channel, stop_channel};
pub use source::{PauseGate, PipelineSource, PipelineTask, TaskFactory};
pub use syncer::{Syncer, SyncerBuilder};
pub use types::{DesiredPipelines, SyncAction, SyncOutcome, SyncReport};

pub use pipesync_core::{Error, GateState, Pipeline, PipelineKey, Result};
