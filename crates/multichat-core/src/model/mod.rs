//! Entity model: personas, conversations, messages.
//!
//! Plain value types. Everything here is `Clone + PartialEq` and edited by
//! building a new value, never by mutating one held elsewhere.

pub mod conversation;
pub mod persona;

pub use conversation::{Conversation, Message};
pub use persona::{parse_tags, Persona, PrivacyLevel};
