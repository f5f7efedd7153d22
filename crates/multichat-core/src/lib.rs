//! # multichat-core
//!
//! Data layer for multichat, a chat app where one user speaks as several
//! personas across independent conversations.
//!
//! This crate is UI-agnostic and can be driven by:
//! - A desktop shell (through [`AppContext`])
//! - The `multichat` CLI
//! - Tests, with fixed ids and a fixed clock
//!
//! ## Key Concepts
//!
//! - **Persona**: one named identity; messages carry a copy of their sender
//! - **Registry**: in-memory collection plus a "current" pointer
//! - **DataStore**: one JSON file per entity under the data directory
//! - **Bundle**: a portable export of members, conversations, and settings

pub mod bundle;
pub mod context;
pub mod event_bus;
pub mod model;
pub mod notify;
pub mod paths;
pub mod persistence;
pub mod providers;
pub mod registry;
pub mod search;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use bundle::{BundleError, ExportSelection, ImportMode};
pub use context::{ActionError, AppContext, MemberDraft};
pub use event_bus::{AppEvent, EventBus};
pub use model::{Conversation, Message, Persona, PrivacyLevel};
pub use persistence::{AppSettings, LoadError, LoadReport, StorageError};
pub use registry::{ConversationRegistry, MemberRegistry, NameError};
pub use state::AppState;
pub use store::{DataStore, LoadAllOutcome, SaveAllReport};
