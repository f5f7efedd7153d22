//! Notification decisions.
//!
//! [`NotificationPolicy`] decides whether something deserves a desktop
//! notification and what it says. Showing it is up to whoever listens on
//! the event bus.

use serde::{Deserialize, Serialize};

use crate::event_bus::{topics, EventBus};
use crate::model::Message;
use crate::persistence::AppSettings;

/// Message previews are cut to this many characters.
pub const PREVIEW_CHARS: usize = 50;

const NEW_MESSAGE_TITLE: &str = "New message";
const SYSTEM_TITLE: &str = "System notification";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    NewMessage,
    System,
}

impl NotificationKind {
    pub fn topic(&self) -> &'static str {
        match self {
            NotificationKind::NewMessage => topics::NOTIFICATION_NEW_MESSAGE,
            NotificationKind::System => topics::NOTIFICATION_SYSTEM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
}

/// First [`PREVIEW_CHARS`] characters of `content`, with `...` when cut.
pub fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicy {
    enabled: bool,
}

impl NotificationPolicy {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn from_settings(settings: &AppSettings) -> Self {
        Self::new(settings.enable_notifications)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        log::info!("Notifications enabled: {enabled}");
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Notification for a newly sent message, or `None` when disabled.
    pub fn new_message(&self, message: &Message) -> Option<Notification> {
        if !self.enabled {
            log::debug!("Notifications disabled, skipping message {}", message.id);
            return None;
        }
        Some(Notification {
            kind: NotificationKind::NewMessage,
            title: NEW_MESSAGE_TITLE.to_string(),
            body: format!("{}: {}", message.sender.name, preview(&message.content)),
        })
    }

    pub fn system(&self, text: &str) -> Option<Notification> {
        if !self.enabled {
            return None;
        }
        Some(Notification {
            kind: NotificationKind::System,
            title: SYSTEM_TITLE.to_string(),
            body: text.to_string(),
        })
    }

    /// Publish `notification` on its topic. Returns the receiver count.
    pub fn publish(&self, bus: &EventBus, notification: &Notification) -> usize {
        log::info!("Notification: {} - {}", notification.title, notification.body);
        bus.emit(notification.kind.topic(), notification)
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
