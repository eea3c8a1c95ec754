//! # pipesyncd
//!
//! Runs the pipeline syncer against a TOML manifest.
//!
//! ## Startup
//!
//! 1. **Tracing** - `RUST_LOG` filter, `info` by default
//! 2. **Config** - optional `--config` file, defaults otherwise
//! 3. **Manifest** - pipelines and gate, re-read every pass
//! 4. **Sync Loop** - one pass per interval until Ctrl+C
//!
//! With `--once` a single pass runs, its outcome is printed as JSON, and
//! the started tasks are drained before exit.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use pipesync::{
    ManifestStore, Pipeline, PipelineKey, PipelineTask, ReadySignal, StopSignal, SyncLoop,
    SyncerBuilder, SyncerConfig, TaskFactory,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Keep one task per configured pipeline running.
#[derive(Debug, Parser)]
#[command(name = "pipesyncd", version, about)]
struct Args {
    /// Pipeline manifest (TOML with [gate] and [[pipelines]]).
    #[arg(long)]
    manifest: PathBuf,

    /// Syncer configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single pass, print its outcome as JSON, then exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SyncerConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SyncerConfig::default(),
    };

    let store = Arc::new(ManifestStore::new(&args.manifest));
    let factory: Arc<dyn TaskFactory> = Arc::new(HeartbeatFactory {
        every: config.interval,
    });

    let syncer = Arc::new(
        SyncerBuilder::new()
            .with_store(store)
            .with_factory(factory)
            .with_config(config)
            .build()
            .context("Failed to build syncer")?,
    );

    info!(manifest = %args.manifest.display(), "pipesyncd starting");

    if args.once {
        let outcome = syncer.sync().await;
        let json = serde_json::to_string_pretty(&outcome).context("Failed to encode outcome")?;
        println!("{json}");
        syncer.shutdown().await;
        return Ok(());
    }

    let mut sync_loop = SyncLoop::new(Arc::clone(&syncer));
    let stopper = sync_loop.stopper();
    let loop_handle = tokio::spawn(async move { sync_loop.run().await });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, stopping");
    stopper.stop();

    let stats = loop_handle.await.context("Sync loop task failed")?;
    info!(
        passes = stats.passes,
        skipped = stats.skipped,
        remaining_tasks = stats.remaining_tasks,
        "pipesyncd stopped"
    );
    Ok(())
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Builds tasks that log a heartbeat until stopped.
struct HeartbeatFactory {
    every: Duration,
}

impl TaskFactory for HeartbeatFactory {
    fn build(&self, pipeline: &Pipeline) -> pipesync::Result<Box<dyn PipelineTask>> {
        Ok(Box::new(HeartbeatTask {
            key: pipeline.key(),
            every: self.every,
        }))
    }
}

struct HeartbeatTask {
    key: PipelineKey,
    every: Duration,
}

#[async_trait]
impl PipelineTask for HeartbeatTask {
    async fn run(self: Box<Self>, mut stop: StopSignal, ready: ReadySignal) -> pipesync::Result<()> {
        let mut ticker = tokio::time::interval(self.every);
        ready.notify();
        loop {
            tokio::select! {
                () = stop.recv() => {
                    info!(pipeline = %self.key, "Heartbeat task stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    info!(pipeline = %self.key, "Heartbeat");
                }
            }
        }
    }
}
