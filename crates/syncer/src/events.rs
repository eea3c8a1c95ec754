//! Lifecycle events published by the syncer.

use pipesync_core::PipelineKey;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;
use ulid::Ulid;

/// Something observable happened to a pipeline task or a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A task was launched and registered.
    Started { key: PipelineKey, run_id: Ulid },
    /// A task reported readiness.
    Ready { key: PipelineKey, run_id: Ulid },
    /// A stop was requested for a registered task.
    StopRequested { key: PipelineKey, run_id: Ulid },
    /// A task's run returned and its entry was deregistered.
    Exited {
        key: PipelineKey,
        run_id: Ulid,
        error: Option<String>,
    },
    /// The factory could not build a task; nothing was registered.
    ConstructionFailed { key: PipelineKey, reason: String },
    /// The gate was missing or its lookup failed; the pass did nothing.
    GateUnavailable { gate: String, reason: String },
    /// Listing desired pipelines failed; the pass did nothing.
    ListingFailed { reason: String },
}

impl SyncEvent {
    /// The pipeline this event concerns, if any.
    #[must_use]
    pub const fn key(&self) -> Option<&PipelineKey> {
        match self {
            Self::Started { key, .. }
            | Self::Ready { key, .. }
            | Self::StopRequested { key, .. }
            | Self::Exited { key, .. }
            | Self::ConstructionFailed { key, .. } => Some(key),
            Self::GateUnavailable { .. } | Self::ListingFailed { .. } => None,
        }
    }
}

/// Cloneable publisher for `SyncEvent`s.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventPublisher {
    /// Create a publisher buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: SyncEvent) {
        if let Err(e) = self.tx.send(event) {
            trace!(event = ?e.0, "No subscribers for sync event");
        }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_silent() {
        let publisher = EventPublisher::new(4);
        publisher.publish(SyncEvent::ListingFailed {
            reason: "down".to_string(),
        });
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let publisher = EventPublisher::new(4);
        let mut rx = publisher.subscribe();
        let key = PipelineKey::new(1, "pipeline");
        let run_id = Ulid::new();
        publisher.publish(SyncEvent::Started {
            key: key.clone(),
            run_id,
        });

        let received = rx.recv().await.ok();
        assert_eq!(received.as_ref().and_then(SyncEvent::key), Some(&key));
    }

    #[test]
    fn pass_level_events_have_no_key() {
        let event = SyncEvent::GateUnavailable {
            gate: "scheduler".to_string(),
            reason: "not found".to_string(),
        };
        assert!(event.key().is_none());
    }
}
