//! The syncer: one reconciliation pass on demand.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use pipesync_core::{Error, Pipeline, PipelineKey};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::config::SyncerConfig;
use crate::error::SyncError;
use crate::events::{EventPublisher, SyncEvent};
use crate::registry::{Registry, RunningPipeline, RunningSummary};
use crate::signal::{ready_channel, stop_channel};
use crate::source::{PauseGate, PipelineSource, PipelineTask, TaskFactory};
use crate::types::{DesiredPipelines, SyncAction, SyncOutcome, SyncReport, diff};

type RunFuture = Pin<Box<dyn Future<Output = pipesync_core::Result<()>> + Send>>;

/// Keeps one running task per desired pipeline.
///
/// Each call to [`Syncer::sync`] consults the gate, lists desired
/// pipelines, and under the registry lock stops tasks whose key is no
/// longer desired and starts tasks for newly desired keys. A watcher per
/// task deregisters it when its run returns, for any reason.
pub struct Syncer {
    /// Desired state.
    source: Arc<dyn PipelineSource>,
    /// Global suspend switch.
    gate: Arc<dyn PauseGate>,
    /// Task construction.
    factory: Arc<dyn TaskFactory>,
    /// Running tasks, shared with watchers.
    registry: Arc<Registry>,
    /// Lifecycle event fan-out.
    events: EventPublisher,
    /// Configuration.
    config: SyncerConfig,
}

impl Syncer {
    /// Create a new syncer.
    pub fn new(
        source: Arc<dyn PipelineSource>,
        gate: Arc<dyn PauseGate>,
        factory: Arc<dyn TaskFactory>,
        config: SyncerConfig,
    ) -> Self {
        let events = EventPublisher::new(config.event_capacity);
        Self {
            source,
            gate,
            factory,
            registry: Arc::new(Registry::new()),
            events,
            config,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Never blocks on task completion. Stop requests are fire-and-forget
    /// and started tasks may still be initializing when this returns.
    pub async fn sync(&self) -> SyncOutcome {
        if let Some(outcome) = self.check_gate().await {
            return outcome;
        }

        let snapshot = match self.source.list_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // A failed listing is not an empty listing.
                warn!(error = %e, "Listing pipelines failed, skipping pass");
                self.events.publish(SyncEvent::ListingFailed {
                    reason: e.to_string(),
                });
                return SyncOutcome::Skipped(SyncError::listing_failed(e.to_string()));
            }
        };

        let desired = DesiredPipelines::from_snapshot(snapshot);
        if desired.is_empty() {
            info!("No pipelines desired, every running task will be stopped");
        }
        SyncOutcome::Applied(self.apply(&desired).await)
    }

    /// Returns the outcome to short-circuit with, or `None` to proceed.
    async fn check_gate(&self) -> Option<SyncOutcome> {
        let gate = &self.config.gate_name;
        let reason = match self.gate.lookup(gate).await {
            Ok(Some(state)) if state.paused => {
                debug!(gate = %gate, "Syncing suspended by gate");
                return Some(SyncOutcome::Suspended);
            }
            Ok(Some(_)) => return None,
            Ok(None) => "not found".to_string(),
            Err(e) => e.to_string(),
        };

        warn!(gate = %gate, reason = %reason, "Gate unavailable, skipping pass");
        self.events.publish(SyncEvent::GateUnavailable {
            gate: gate.clone(),
            reason: reason.clone(),
        });
        Some(SyncOutcome::Skipped(SyncError::gate_unavailable(
            gate.clone(),
            reason,
        )))
    }

    /// Diff and apply under a single hold of the registry lock.
    async fn apply(&self, desired: &DesiredPipelines) -> SyncReport {
        let mut running = self.registry.lock().await;
        let actions = diff(desired, &running);

        debug!(
            desired = desired.len(),
            running = running.len(),
            actions = actions.len(),
            "Computed sync actions"
        );

        let mut started = Vec::new();
        let mut stopped = Vec::new();
        let mut failed = Vec::new();

        for action in actions {
            match action {
                SyncAction::Stop(key) => {
                    let Some(entry) = running.get(&key) else {
                        continue;
                    };
                    if entry.request_stop() {
                        info!(pipeline = %key, run_id = %entry.run_id, "Requested pipeline stop");
                        self.events.publish(SyncEvent::StopRequested {
                            key: key.clone(),
                            run_id: entry.run_id,
                        });
                        stopped.push(key);
                    } else {
                        debug!(pipeline = %key, "Stop already requested, awaiting exit");
                    }
                }
                SyncAction::Start(pipeline) => {
                    let key = pipeline.key();
                    match self.build_task(&pipeline) {
                        Ok(task) => {
                            let entry = self.launch(pipeline, task);
                            running.insert(key.clone(), entry);
                            started.push(key);
                        }
                        Err(reason) => {
                            warn!(pipeline = %key, error = %reason, "Failed to build pipeline task");
                            self.events.publish(SyncEvent::ConstructionFailed {
                                key: key.clone(),
                                reason: reason.clone(),
                            });
                            failed.push(SyncError::task_failed(key, reason));
                        }
                    }
                }
            }
        }

        let report = SyncReport::new(started, stopped, failed, running.len());
        drop(running);

        if report.converged {
            debug!(running = report.running, "Pipelines converged");
        } else {
            info!(
                started = report.started.len(),
                stopped = report.stopped.len(),
                failed = report.failed.len(),
                running = report.running,
                "Sync pass complete"
            );
        }

        report
    }

    /// Build a task, turning a factory error or panic into a failure reason.
    fn build_task(&self, pipeline: &Pipeline) -> Result<Box<dyn PipelineTask>, String> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.factory.build(pipeline))) {
            Ok(Ok(task)) => Ok(task),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(Error::task_construction_failed(
                pipeline.key().to_string(),
                format!("factory panicked: {}", panic_message(&*payload)),
            )
            .to_string()),
        }
    }

    /// Spawn the task and its watcher; return the entry to register.
    fn launch(&self, pipeline: Pipeline, task: Box<dyn PipelineTask>) -> RunningPipeline {
        let key = pipeline.key();
        let run_id = Ulid::new();
        let (stop_handle, stop) = stop_channel();
        let (ready, ready_rx) = ready_channel();

        info!(pipeline = %key, run_id = %run_id, "Starting pipeline task");
        self.events.publish(SyncEvent::Started {
            key: key.clone(),
            run_id,
        });

        tokio::spawn(watch(
            key,
            run_id,
            task.run(stop, ready),
            ready_rx,
            Arc::clone(&self.registry),
            self.events.clone(),
        ));

        RunningPipeline::new(pipeline, run_id, stop_handle)
    }

    /// Stop every task and wait for the registry to drain.
    ///
    /// Returns the number of tasks still registered when
    /// `shutdown_timeout` elapsed, zero on a clean drain.
    pub async fn shutdown(&self) -> usize {
        let stopping = self.registry.stop_all().await;
        info!(stopping = stopping.len(), "Shutting down pipeline tasks");

        for (key, run_id) in stopping {
            self.events.publish(SyncEvent::StopRequested { key, run_id });
        }

        match tokio::time::timeout(self.config.shutdown_timeout, self.registry.wait_drained()).await
        {
            Ok(()) => {
                info!("All pipeline tasks exited");
                0
            }
            Err(_) => {
                let remaining = self.registry.len().await;
                warn!(
                    remaining,
                    timeout_ms = self.config.shutdown_timeout.as_millis(),
                    "Shutdown timed out with pipeline tasks still running"
                );
                remaining
            }
        }
    }

    /// Subscribe to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the running tasks.
    pub async fn running(&self) -> Vec<RunningSummary> {
        self.registry.snapshot().await
    }

    /// Whether a task is registered under `key`.
    pub async fn is_running(&self, key: &PipelineKey) -> bool {
        self.registry.contains(key).await
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncerConfig {
        &self.config
    }
}

/// Run the task on its own tokio task and deregister it once it returns.
///
/// A panicking task surfaces as a join error and is treated as a failure.
async fn watch(
    key: PipelineKey,
    run_id: Ulid,
    run: RunFuture,
    ready_rx: oneshot::Receiver<()>,
    registry: Arc<Registry>,
    events: EventPublisher,
) {
    let mut handle = tokio::spawn(run);

    // Readiness is reported if it comes first; deregistration only waits
    // on the run itself.
    let finished = tokio::select! {
        biased;
        ready = ready_rx => {
            if ready.is_ok() {
                debug!(pipeline = %key, run_id = %run_id, "Pipeline task ready");
                events.publish(SyncEvent::Ready {
                    key: key.clone(),
                    run_id,
                });
            }
            None
        }
        joined = &mut handle => Some(joined),
    };
    let joined = match finished {
        Some(joined) => joined,
        None => handle.await,
    };

    let error = match joined {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) if e.is_panic() => Some(Error::task_failed("task panicked").to_string()),
        Err(e) => Some(Error::task_failed(e.to_string()).to_string()),
    };

    if !registry.deregister(&key, run_id).await {
        debug!(pipeline = %key, run_id = %run_id, "Entry already replaced, nothing to deregister");
    }

    match &error {
        None => info!(pipeline = %key, run_id = %run_id, "Pipeline task exited"),
        Some(reason) => warn!(
            pipeline = %key,
            run_id = %run_id,
            error = %SyncError::task_failed(key.clone(), reason.clone()),
            "Pipeline task failed"
        ),
    }

    events.publish(SyncEvent::Exited { key, run_id, error });
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Builder for `Syncer`.
pub struct SyncerBuilder {
    source: Option<Arc<dyn PipelineSource>>,
    gate: Option<Arc<dyn PauseGate>>,
    factory: Option<Arc<dyn TaskFactory>>,
    config: SyncerConfig,
}

impl SyncerBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            gate: None,
            factory: None,
            config: SyncerConfig::default(),
        }
    }

    /// Set the desired-state source.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn PipelineSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the pause gate.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<dyn PauseGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Use one store as both source and gate.
    #[must_use]
    pub fn with_store<S>(mut self, store: Arc<S>) -> Self
    where
        S: PipelineSource + PauseGate + 'static,
    {
        self.source = Some(Arc::clone(&store) as Arc<dyn PipelineSource>);
        self.gate = Some(store as Arc<dyn PauseGate>);
        self
    }

    /// Set the task factory.
    #[must_use]
    pub fn with_factory(mut self, factory: Arc<dyn TaskFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SyncerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the syncer.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when a collaborator is missing or the
    /// configuration does not validate.
    pub fn build(self) -> pipesync_core::Result<Syncer> {
        self.config.validate()?;

        let source = self
            .source
            .ok_or_else(|| Error::invalid_config("Pipeline source is required"))?;
        let gate = self
            .gate
            .ok_or_else(|| Error::invalid_config("Pause gate is required"))?;
        let factory = self
            .factory
            .ok_or_else(|| Error::invalid_config("Task factory is required"))?;

        Ok(Syncer::new(source, gate, factory, self.config))
    }
}

impl Default for SyncerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
