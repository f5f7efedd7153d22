//! Conversations and the messages inside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::persona::Persona;

/// A single message in a conversation.
///
/// `sender` is a full copy of the persona as it was when the message was
/// sent, not a reference by id. Renaming a persona later leaves its old
/// messages untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    pub id: String,

    /// When this message was sent.
    pub timestamp: DateTime<Utc>,

    /// Snapshot of the sending persona.
    pub sender: Persona,

    /// Message text.
    pub content: String,

    /// Ids of related messages.
    #[serde(default)]
    pub references: Vec<String>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        sender: Persona,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            sender,
            content: content.into(),
            references: Vec::new(),
        }
    }

    pub fn with_references<I, S>(&self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            references: references.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }
}

/// A conversation thread.
///
/// On disk the conversation file never carries messages; they live in
/// `messages/{id}/` and are attached after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation identifier. Also names the message directory.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Messages in chronological (insertion) order.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            messages: Vec::new(),
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_messages(&self, messages: Vec<Message>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            messages,
        }
    }

    /// Copy of this conversation with `message` appended.
    pub fn with_message(&self, message: Message) -> Self {
        let mut messages = self.messages.clone();
        messages.push(message);
        self.with_messages(messages)
    }

    /// Copy without messages, as written to `conversations/{id}.json`.
    pub fn header(&self) -> Self {
        self.with_messages(Vec::new())
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sender() -> Persona {
        Persona::new("p-1", "Ash")
    }

    fn message(id: &str, content: &str) -> Message {
        let ts = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        Message::new(id, ts, sender(), content)
    }

    #[test]
    fn with_message_appends_without_touching_original() {
        let conv = Conversation::new("c-1", "Daily");
        let updated = conv.with_message(message("m-1", "hi"));

        assert!(conv.messages.is_empty());
        assert_eq!(updated.messages.len(), 1);
        assert_eq!(updated.last_message().unwrap().content, "hi");
    }

    #[test]
    fn header_drops_messages() {
        let conv = Conversation::new("c-1", "Daily").with_message(message("m-1", "hi"));
        let header = conv.header();

        assert_eq!(header.id, "c-1");
        assert_eq!(header.name, "Daily");
        assert!(header.messages.is_empty());
    }

    #[test]
    fn message_timestamp_is_iso8601() {
        let json = serde_json::to_string(&message("m-1", "hi")).unwrap();
        assert!(json.contains("\"timestamp\":\"2025-03-01T12:00:00Z\""));
    }

    #[test]
    fn message_embeds_full_sender() {
        let json = serde_json::to_value(message("m-1", "hi")).unwrap();
        assert_eq!(json["sender"]["id"], "p-1");
        assert_eq!(json["sender"]["name"], "Ash");
        assert_eq!(json["sender"]["privacyLevel"], "PUBLIC");
    }

    #[test]
    fn references_default_to_empty() {
        let json = r#"{
            "id": "m-1",
            "timestamp": "2025-03-01T12:00:00Z",
            "sender": {"id": "p-1", "name": "Ash"},
            "content": "hi"
        }"#;
        let parsed: Message = serde_json::from_str(json).unwrap();

        assert!(parsed.references.is_empty());
        assert_eq!(parsed, message("m-1", "hi"));
    }
}
