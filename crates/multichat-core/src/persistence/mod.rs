//! Persistence layer for members, conversations, messages, and settings.
//!
//! # Overview
//!
//! This module handles all file I/O for multichat's persistent state:
//!
//! - **Members** - One file per persona
//! - **Conversations** - One header file per conversation, no messages
//! - **Messages** - One file per message, named by position
//! - **Selection** - Raw-id pointer files for the current member and conversation
//! - **Settings** - User preferences
//!
//! # File Locations
//!
//! All data lives under the data directory (see [`crate::paths`]):
//!
//! ```text
//! ~/.multichat/
//! ├── members/
//! │   └── <member-id>.json
//! ├── conversations/
//! │   └── <conversation-id>.json
//! ├── messages/
//! │   └── <conversation-id>/
//! │       ├── 0.json
//! │       ├── 1.json
//! │       └── ...
//! ├── current_member.txt
//! ├── current_conversation.txt
//! └── settings.json
//! ```
//!
//! # Design Principles
//!
//! ## Atomic Writes
//!
//! All save operations use write-then-rename:
//!
//! 1. Write to `file.json.tmp`
//! 2. Rename to `file.json` (atomic on Unix)
//!
//! ## Partial Loads
//!
//! A file that cannot be read or decoded is skipped and recorded in a
//! [`LoadReport`]. One bad file never hides its siblings.
//!
//! # Usage
//!
//! These are directory-scoped functions. Most callers go through
//! [`crate::store::DataStore`], which adds write locking and the
//! `save_all` / `load_all` sequences.
//!
//! ```ignore
//! use multichat_core::persistence::{load_all_members, save_member};
//!
//! save_member(&members_dir, &persona)?;
//! let report = load_all_members(&members_dir);
//! ```

pub mod codec;
pub mod conversations;
pub mod error;
pub mod members;
pub mod messages;
pub mod selection;
pub mod settings;

pub use codec::{read_json, write_atomic, write_json};
pub use conversations::{
    conversation_exists, delete_conversation, load_all_conversations, load_conversation,
    save_conversation,
};
pub use error::{LoadError, LoadReport, StorageError};
pub use members::{delete_member, load_all_members, load_member, member_exists, save_member};
pub use messages::{append_message, delete_messages, load_messages, message_dir, save_messages};
pub use selection::{load_pointer, save_pointer, CURRENT_CONVERSATION_FILE, CURRENT_MEMBER_FILE};
pub use settings::{
    clamp_theme_index, load_settings, save_settings, save_theme_preference, AppSettings,
    SETTINGS_FILE, THEME_NAMES,
};
