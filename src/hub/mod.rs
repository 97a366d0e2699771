//! Live update hub
//!
//! Observers connect, subscribe to repository slugs, and receive lifecycle
//! events for those slugs only. Delivery is at-most-once with no backlog:
//! an observer whose queue is full or closed simply misses the event, and an
//! observer that connects late never sees earlier events.

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::config::HubConfig;

/// Kind of lifecycle event (kebab-case on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    CommandOutput,
    CommandComplete,
    SnapshotReady,
    AnalysisReady,
    WorkUpdate,
}

/// Event pushed to observers: `{"type": ..., "slug": ..., "payload": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub slug: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl LiveEvent {
    pub fn new(kind: EventKind, slug: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            slug: slug.into(),
            payload,
        }
    }
}

/// Messages an observer may send. Anything else is ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum InboundMessage {
    Subscribe { slug: String },
}

struct Observer {
    sender: mpsc::Sender<LiveEvent>,
    subscriptions: HashSet<String>,
}

/// Subscription-scoped broadcaster
pub struct Hub {
    observers: DashMap<Uuid, Observer>,
    known_repos: DashSet<String>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Hub {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            observers: DashMap::new(),
            known_repos: DashSet::new(),
            capacity: config.channel_capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Hub that accepts subscriptions for `slugs`
    pub fn with_repos<I, S>(config: &HubConfig, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let hub = Self::new(config);
        for slug in slugs {
            hub.register_repo(slug);
        }
        hub
    }

    pub fn register_repo(&self, slug: impl Into<String>) {
        self.known_repos.insert(slug.into());
    }

    pub fn is_known(&self, slug: &str) -> bool {
        self.known_repos.contains(slug)
    }

    /// Attach a new observer. It is removed when the returned connection drops.
    pub fn connect(self: &Arc<Self>) -> Connection {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let id = Uuid::new_v4();
        self.observers.insert(
            id,
            Observer {
                sender,
                subscriptions: HashSet::new(),
            },
        );
        debug!(observer = %id, "Observer connected");
        Connection {
            id,
            hub: Arc::clone(self),
            receiver,
        }
    }

    /// Deliver `event` to every observer subscribed to its slug.
    ///
    /// Never blocks. Returns the number of observers that accepted it.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        let mut delivered = 0;
        for entry in self.observers.iter() {
            let observer = entry.value();
            if !observer.subscriptions.contains(&event.slug) {
                continue;
            }
            match observer.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(observer = %entry.key(), slug = %event.slug, "Observer queue full, event dropped");
                }
                // Receiver gone; its Drop will unregister it.
                Err(TrySendError::Closed(_)) => {}
            }
        }
        debug!(kind = ?event.kind, slug = %event.slug, delivered, "Broadcast event");
        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Events skipped because an observer's queue was full
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn subscribe(&self, id: Uuid, slug: String) -> bool {
        if !self.is_known(&slug) {
            debug!(observer = %id, slug = %slug, "Ignoring subscription to unknown repository");
            return false;
        }
        match self.observers.get_mut(&id) {
            Some(mut observer) => {
                debug!(observer = %id, slug = %slug, "Subscribed");
                observer.subscriptions.insert(slug);
                true
            }
            None => false,
        }
    }

    fn disconnect(&self, id: &Uuid) {
        if self.observers.remove(id).is_some() {
            debug!(observer = %id, "Observer disconnected");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(&HubConfig::default())
    }
}

/// One observer's end of the hub
pub struct Connection {
    id: Uuid,
    hub: Arc<Hub>,
    receiver: mpsc::Receiver<LiveEvent>,
}

impl Connection {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Apply a raw inbound message. Returns whether it changed anything.
    ///
    /// Malformed input and unknown slugs are dropped without a reply.
    pub fn handle_inbound(&self, text: &str) -> bool {
        match serde_json::from_str::<InboundMessage>(text) {
            Ok(InboundMessage::Subscribe { slug }) => self.hub.subscribe(self.id, slug),
            Err(e) => {
                debug!(observer = %self.id, "Dropping malformed inbound message: {}", e);
                false
            }
        }
    }

    /// Subscribe without going through the wire format
    pub fn subscribe(&self, slug: impl Into<String>) -> bool {
        self.hub.subscribe(self.id, slug.into())
    }

    /// Next event, or `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.receiver.recv().await
    }

    /// Next already-queued event without waiting
    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.hub.disconnect(&self.id);
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hub() -> Arc<Hub> {
        Arc::new(Hub::with_repos(&HubConfig::default(), ["repo-a", "repo-b"]))
    }

    fn work_update(slug: &str) -> LiveEvent {
        LiveEvent::new(EventKind::WorkUpdate, slug, json!({"id": "abc"}))
    }

    #[tokio::test]
    async fn test_delivers_only_to_subscribers_of_slug() {
        let hub = hub();
        let mut conn = hub.connect();
        assert!(conn.handle_inbound(r#"{"type":"subscribe","slug":"repo-a"}"#));

        assert_eq!(hub.broadcast(&work_update("repo-a")), 1);
        assert_eq!(hub.broadcast(&work_update("repo-b")), 0);

        let event = conn.recv().await.unwrap();
        assert_eq!(event.slug, "repo-a");
        assert_eq!(event.kind, EventKind::WorkUpdate);
        assert!(conn.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_invalid_inbound_is_ignored() {
        let hub = hub();
        let mut conn = hub.connect();
        assert!(!conn.handle_inbound("not json"));
        assert!(!conn.handle_inbound(r#"{"type":"unsubscribe","slug":"repo-a"}"#));
        assert!(!conn.handle_inbound(r#"{"type":"subscribe"}"#));
        assert!(!conn.handle_inbound(r#"{"type":"subscribe","slug":"repo-z"}"#));

        assert_eq!(hub.broadcast(&work_update("repo-a")), 0);
        assert_eq!(hub.broadcast(&work_update("repo-z")), 0);
        assert!(conn.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_late_observer_gets_no_replay() {
        let hub = hub();
        hub.broadcast(&work_update("repo-a"));
        let mut conn = hub.connect();
        conn.subscribe("repo-a");
        assert!(conn.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_disconnect_removes_observer() {
        let hub = hub();
        {
            let conn = hub.connect();
            conn.subscribe("repo-a");
            assert_eq!(hub.observer_count(), 1);
        }
        assert_eq!(hub.observer_count(), 0);
        assert_eq!(hub.broadcast(&work_update("repo-a")), 0);
    }

    #[tokio::test]
    async fn test_full_observer_does_not_block_others() {
        let hub = Arc::new(Hub::with_repos(&HubConfig { channel_capacity: 1 }, ["repo-a"]));
        let slow = hub.connect();
        slow.subscribe("repo-a");
        let mut fast = hub.connect();
        fast.subscribe("repo-a");

        assert_eq!(hub.broadcast(&work_update("repo-a")), 2);
        fast.recv().await.unwrap();
        // slow never drained its single slot
        assert_eq!(hub.broadcast(&work_update("repo-a")), 1);
        assert_eq!(hub.dropped_events(), 1);
    }

    #[test]
    fn test_event_wire_format() {
        let event = LiveEvent::new(EventKind::SnapshotReady, "repo-a", json!({"timestamp": "t"}));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "snapshot-ready");
        assert_eq!(value["slug"], "repo-a");
        assert_eq!(value["payload"]["timestamp"], "t");
    }
}
