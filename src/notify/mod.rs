//! Deferred board notifications
//!
//! Handlers collect events into a per-message [`NotificationQueue`] while
//! they mutate state, then flush the queue once the writes have committed.
//! Listeners that missed a flush recover by re-reading current state, so
//! delivery is best effort by contract.

use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Room that receives administrative events
pub const ADMIN_ROOM: &str = "admin";

/// Room mirroring every group board event
pub const ALL_ROOM: &str = "board:all";

/// Board room for one group
pub fn group_room(platform_group_id: &str) -> String {
    format!("board:{platform_group_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderUpdate,
    SessionStatus,
    PaymentUpdate,
    StoreChange,
    ChatMessage,
    ApplicationUpdate,
    GroupUpdate,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderUpdate => "order_update",
            EventKind::SessionStatus => "session_status",
            EventKind::PaymentUpdate => "payment_update",
            EventKind::StoreChange => "store_change",
            EventKind::ChatMessage => "chat_message",
            EventKind::ApplicationUpdate => "application_update",
            EventKind::GroupUpdate => "group_update",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingEvent {
    pub kind: EventKind,
    pub room: String,
    pub payload: Value,
}

/// Async callback that pushes one event to one room
pub type Broadcaster = Arc<dyn Fn(String, Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Maps event kinds to their delivery callbacks. Built once at startup and
/// handed to handlers explicitly.
#[derive(Default, Clone)]
pub struct BroadcastRegistry {
    broadcasters: HashMap<EventKind, Broadcaster>,
}

impl BroadcastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: EventKind, broadcaster: Broadcaster) {
        self.broadcasters.insert(kind, broadcaster);
    }

    pub fn get(&self, kind: EventKind) -> Option<&Broadcaster> {
        self.broadcasters.get(&kind)
    }
}

/// Events accumulated while handling one incoming message
#[derive(Default)]
pub struct NotificationQueue {
    events: Vec<PendingEvent>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, kind: EventKind, room: impl Into<String>, payload: Value) {
        self.events.push(PendingEvent {
            kind,
            room: room.into(),
            payload,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Drop everything without delivering. Used on failed handling so
    /// listeners never see events for state that was rolled back.
    pub fn discard(&mut self) {
        let dropped = self.events.len();
        if dropped > 0 {
            tracing::debug!(dropped, "discarded pending notifications");
        }
        self.events.clear();
    }

    /// Deliver all queued events in enqueue order. A failing or missing
    /// broadcaster is logged and never stops the rest of the queue.
    pub async fn flush(&mut self, registry: &BroadcastRegistry) {
        for event in self.events.drain(..) {
            match registry.get(event.kind) {
                Some(broadcaster) => {
                    if let Err(err) =
                        broadcaster(event.room.clone(), event.payload.clone()).await
                    {
                        tracing::warn!(
                            kind = event.kind.as_str(),
                            room = %event.room,
                            error = %err,
                            "notification delivery failed"
                        );
                    }
                }
                None => {
                    tracing::warn!(
                        kind = event.kind.as_str(),
                        room = %event.room,
                        "no broadcaster registered, event dropped"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn recording_broadcaster(log: Arc<Mutex<Vec<(String, Value)>>>) -> Broadcaster {
        Arc::new(move |room, payload| {
            let log = log.clone();
            Box::pin(async move {
                log.lock().unwrap().push((room, payload));
                Ok(())
            })
        })
    }

    fn failing_broadcaster() -> Broadcaster {
        Arc::new(|_room, _payload| Box::pin(async { anyhow::bail!("connection reset") }))
    }

    #[tokio::test]
    async fn test_flush_empty_queue_is_noop() {
        let registry = BroadcastRegistry::new();
        let mut queue = NotificationQueue::new();
        queue.flush(&registry).await;
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_flush_preserves_enqueue_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BroadcastRegistry::new();
        registry.register(EventKind::OrderUpdate, recording_broadcaster(log.clone()));
        registry.register(EventKind::SessionStatus, recording_broadcaster(log.clone()));

        let mut queue = NotificationQueue::new();
        queue.enqueue(EventKind::SessionStatus, "board:g1", json!({"seq": 1}));
        queue.enqueue(EventKind::OrderUpdate, "board:g1", json!({"seq": 2}));
        queue.enqueue(EventKind::OrderUpdate, "board:all", json!({"seq": 3}));
        queue.flush(&registry).await;

        let delivered = log.lock().unwrap();
        assert_eq!(delivered.len(), 3);
        assert_eq!(delivered[0].1["seq"], 1);
        assert_eq!(delivered[1].1["seq"], 2);
        assert_eq!(delivered[2].0, "board:all");
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_kind_is_dropped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BroadcastRegistry::new();
        registry.register(EventKind::OrderUpdate, recording_broadcaster(log.clone()));

        let mut queue = NotificationQueue::new();
        queue.enqueue(EventKind::StoreChange, "board:g1", json!({}));
        queue.enqueue(EventKind::OrderUpdate, "board:g1", json!({"kept": true}));
        queue.flush(&registry).await;

        let delivered = log.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1["kept"], true);
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_block_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BroadcastRegistry::new();
        registry.register(EventKind::OrderUpdate, failing_broadcaster());
        registry.register(EventKind::SessionStatus, recording_broadcaster(log.clone()));

        let mut queue = NotificationQueue::new();
        queue.enqueue(EventKind::OrderUpdate, "board:g1", json!({}));
        queue.enqueue(EventKind::SessionStatus, "board:g1", json!({"status": "ended"}));
        queue.flush(&registry).await;

        let delivered = log.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].1["status"], "ended");
    }

    #[tokio::test]
    async fn test_discard_drops_everything() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = BroadcastRegistry::new();
        registry.register(EventKind::OrderUpdate, recording_broadcaster(log.clone()));

        let mut queue = NotificationQueue::new();
        queue.enqueue(EventKind::OrderUpdate, "board:g1", json!({}));
        queue.discard();
        queue.flush(&registry).await;

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_group_room_name() {
        assert_eq!(group_room("G123"), "board:G123");
    }
}
