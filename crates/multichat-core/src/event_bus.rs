//! Change and notification broadcasting.
//!
//! The core never renders anything. When a registry changes or a
//! notification is due, it publishes an [`AppEvent`] here and whatever
//! front end is attached (desktop shell, CLI, tests) reacts.
//!
//! # Example
//!
//! ```rust
//! use multichat_core::event_bus::{topics, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit(topics::MEMBERS_CHANGED, &serde_json::json!({"id": "p-1"}));
//!
//! let event = rx.try_recv().unwrap();
//! assert_eq!(event.topic, topics::MEMBERS_CHANGED);
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

/// Topic names published by the core.
pub mod topics {
    pub const MEMBERS_CHANGED: &str = "members:changed";
    pub const CURRENT_MEMBER_CHANGED: &str = "members:current";
    pub const CONVERSATIONS_CHANGED: &str = "conversations:changed";
    pub const CURRENT_CONVERSATION_CHANGED: &str = "conversations:current";
    pub const MESSAGE_SENT: &str = "conversations:message";
    pub const SETTINGS_CHANGED: &str = "settings:changed";
    pub const DATA_RELOADED: &str = "data:reloaded";
    pub const NOTIFICATION_NEW_MESSAGE: &str = "notification:new-message";
    pub const NOTIFICATION_SYSTEM: &str = "notification:system";
}

/// A published event: topic plus JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl AppEvent {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    /// Whether the topic is in the `notification:` family.
    pub fn is_notification(&self) -> bool {
        self.topic.starts_with("notification:")
    }
}

/// Broadcast channel for [`AppEvent`]s.
///
/// Slow subscribers that fall more than the capacity behind miss events
/// (`RecvError::Lagged`). Emitting with no subscribers is not an error.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish `payload` under `topic`. Returns how many subscribers got it.
    pub fn emit<T: Serialize>(&self, topic: &str, payload: &T) -> usize {
        match serde_json::to_value(payload) {
            Ok(value) => self.publish(AppEvent::new(topic, value)),
            Err(e) => {
                log::warn!("Dropping {topic} event, payload did not serialize: {e}");
                0
            }
        }
    }

    pub fn publish(&self, event: AppEvent) -> usize {
        log::trace!("Publishing {}", event.topic);
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
