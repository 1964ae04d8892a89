//! Plan update broadcasting.
//!
//! After every successful mutation the reducer hands a read-only snapshot
//! to a [`PlanBroadcaster`]. Other views of the same event (another window,
//! a display screen) subscribe and redraw from it.

use crate::snapshot::PlanSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Snapshot published after a mutation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanUpdate {
    /// Revision the snapshot was taken at; increases by one per mutation
    pub revision: u64,
    /// Action that caused the update
    pub reason: String,
    /// Full state after the mutation
    pub snapshot: PlanSnapshot,
}

/// Receives plan updates
pub trait PlanBroadcaster: Send + Sync {
    /// Deliver an update; must not block
    fn publish(&self, update: PlanUpdate);
}

/// Broadcaster backed by a `tokio::sync::broadcast` channel
///
/// Slow subscribers lag and miss intermediate revisions, which is fine since
/// every update carries the full snapshot.
#[derive(Clone, Debug)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<PlanUpdate>,
}

impl ChannelBroadcaster {
    /// Create a channel buffering `capacity` updates per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future updates
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PlanUpdate> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl PlanBroadcaster for ChannelBroadcaster {
    fn publish(&self, update: PlanUpdate) {
        let revision = update.revision;
        match self.sender.send(update) {
            Ok(receivers) => {
                tracing::trace!(revision, receivers, "Plan update published");
            },
            Err(_) => {
                tracing::trace!(revision, "Plan update dropped, no subscribers");
            },
        }
    }
}

/// Broadcaster that discards every update
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopBroadcaster;

impl PlanBroadcaster for NoopBroadcaster {
    fn publish(&self, _update: PlanUpdate) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(revision: u64) -> PlanUpdate {
        PlanUpdate {
            revision,
            reason: "AddNextTable".to_string(),
            snapshot: PlanSnapshot::default(),
        }
    }

    #[test]
    fn test_subscribers_receive_updates() {
        let broadcaster = ChannelBroadcaster::new(4);
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish(update(1));
        broadcaster.publish(update(2));

        assert_eq!(rx.try_recv().map(|u| u.revision).ok(), Some(1));
        assert_eq!(rx.try_recv().map(|u| u.revision).ok(), Some(2));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_without_subscribers_is_harmless() {
        let broadcaster = ChannelBroadcaster::new(1);
        broadcaster.publish(update(1));
        NoopBroadcaster.publish(update(2));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
