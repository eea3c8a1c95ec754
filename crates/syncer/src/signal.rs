//! Stop and readiness signalling between the syncer and a running task.

use tokio::sync::{oneshot, watch};

/// Create a connected stop handle and signal.
#[must_use]
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

/// Create a connected readiness signal and receiver.
#[must_use]
pub fn ready_channel() -> (ReadySignal, oneshot::Receiver<()>) {
    let (tx, rx) = oneshot::channel();
    (ReadySignal { tx }, rx)
}

/// Engine-side half of the stop flag.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    /// Request the task to stop.
    ///
    /// Returns `true` only for the first request; later calls leave the
    /// flag set and notify nobody.
    pub fn request(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Task-side half of the stop flag.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    /// Resolve once a stop has been requested.
    ///
    /// Also resolves when the handle is gone, since nobody is left to keep
    /// the task alive. Safe to call repeatedly and inside `select!` loops.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|requested| *requested).await;
    }

    /// Whether a stop has been requested, without waiting.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Send-once readiness notification handed to a task.
#[derive(Debug)]
pub struct ReadySignal {
    tx: oneshot::Sender<()>,
}

impl ReadySignal {
    /// Report that the task finished initializing.
    pub fn notify(self) {
        // Nobody listening is fine; readiness is informational.
        let _ = self.tx.send(());
    }
}
