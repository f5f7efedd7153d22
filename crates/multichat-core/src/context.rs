//! AppContext - the one handle a front end needs.
//!
//! `AppContext` owns the shared [`AppState`], the [`DataStore`] it is
//! persisted to, the [`EventBus`] changes are announced on, and the id and
//! clock sources. Every action mutates memory, persists what it touched,
//! and publishes an event.
//!
//! ## Architecture
//!
//! ```text
//!          ┌──────────────────────────────┐
//!          │          AppContext          │
//!          ├──────────────────────────────┤
//!          │  Arc<RwLock<AppState>>       │
//!          │  Arc<DataStore>              │
//!          │  Arc<EventBus>               │
//!          │  IdGenerator, Clock          │
//!          └──────────────┬───────────────┘
//!                         │
//!           ┌─────────────┴─────────────┐
//!           ▼                           ▼
//!    ┌─────────────┐             ┌─────────────┐
//!    │  Desktop UI │             │     CLI     │
//!    └─────────────┘             └─────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::json;
use thiserror::Error;

use crate::bundle::{
    self, BundleError, BundlePreview, ExportSelection, ExportSummary, ImportMode, ImportSummary,
};
use crate::event_bus::{topics, EventBus};
use crate::model::{Conversation, Message, Persona, PrivacyLevel};
use crate::notify::NotificationPolicy;
use crate::persistence::{AppSettings, StorageError};
use crate::providers::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::registry::{validate_conversation_name, validate_member_name, NameError};
use crate::search::{search_messages, SearchHit};
use crate::state::AppState;
use crate::store::{DataStore, LoadAllOutcome, SaveAllReport};

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("No member is selected")]
    NoCurrentMember,

    #[error("No conversation is selected")]
    NoCurrentConversation,

    #[error("Message is empty")]
    EmptyMessage,
}

/// Editable fields of a persona.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberDraft {
    pub name: String,
    pub avatar_path: String,
    pub personality_tags: Vec<String>,
    pub background_memory: String,
    pub privacy_level: PrivacyLevel,
}

impl MemberDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    fn apply(&self, base: &Persona, name: String) -> Persona {
        base.with_name(name)
            .with_avatar_path(self.avatar_path.clone())
            .with_tags(self.personality_tags.iter().cloned())
            .with_background_memory(self.background_memory.clone())
            .with_privacy_level(self.privacy_level)
    }
}

/// Builder for [`AppContext`].
#[derive(Default)]
pub struct AppContextBuilder {
    data_dir: Option<PathBuf>,
    store: Option<Arc<DataStore>>,
    event_bus: Option<Arc<EventBus>>,
    ids: Option<Arc<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AppContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the store at `dir` instead of the default data directory.
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Use an already opened store. Takes precedence over `data_dir`.
    pub fn store(mut self, store: Arc<DataStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the context. State starts empty; call [`AppContext::load_all`].
    pub fn build(self) -> Result<AppContext, StorageError> {
        let store = match (self.store, self.data_dir) {
            (Some(store), _) => store,
            (None, Some(dir)) => Arc::new(DataStore::open(dir)?),
            (None, None) => Arc::new(DataStore::open_default()?),
        };

        Ok(AppContext {
            state: Arc::new(RwLock::new(AppState::new())),
            store,
            event_bus: self.event_bus.unwrap_or_else(|| Arc::new(EventBus::new())),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidGenerator)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        })
    }
}

/// Shared application handle. Cloning shares the same state.
#[derive(Clone)]
pub struct AppContext {
    state: Arc<RwLock<AppState>>,
    store: Arc<DataStore>,
    pub event_bus: Arc<EventBus>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn builder() -> AppContextBuilder {
        AppContextBuilder::new()
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn data_dir(&self) -> &Path {
        self.store.root()
    }

    fn read(&self) -> RwLockReadGuard<'_, AppState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.read().clone()
    }

    /// Run `f` against the current state without copying it.
    pub fn with_state<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.read())
    }

    // ------------------------------------------------------------------------
    // Whole state
    // ------------------------------------------------------------------------

    pub fn load_all(&self) -> LoadAllOutcome {
        let outcome = self.store.load_all(&mut self.write());
        self.event_bus.emit(
            topics::DATA_RELOADED,
            &json!({ "found": outcome.found, "skipped": outcome.failed.len() }),
        );
        outcome
    }

    pub fn save_all(&self) -> SaveAllReport {
        self.store.save_all(&self.read())
    }

    /// Delete every conversation and message. Members and settings stay.
    pub fn clear_history(&self) -> Result<(), ActionError> {
        self.store.clear_history(&mut self.write())?;
        self.event_bus.emit(topics::CONVERSATIONS_CHANGED, &json!({ "cleared": true }));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    /// Create a persona. The first persona becomes the current one.
    pub fn create_member(&self, draft: MemberDraft) -> Result<Persona, ActionError> {
        let mut state = self.write();
        let name = validate_member_name(&state.members, &draft.name, None)?;
        let member = draft.apply(&Persona::new(self.ids.next_id(), ""), name);

        self.store.save_member(&member)?;
        state.members.upsert(member.clone());

        if state.members.current().is_none() {
            state.members.switch_to(&member.id);
            self.store.save_current_member(Some(&member.id))?;
        }

        log::info!("Created member {} ({})", member.name, member.id);
        self.event_bus.emit(topics::MEMBERS_CHANGED, &json!({ "id": member.id }));
        Ok(state.members.find(&member.id).cloned().unwrap_or(member))
    }

    /// Edit a persona. Messages already sent keep the old sender copy.
    pub fn update_member(&self, id: &str, draft: MemberDraft) -> Result<Persona, ActionError> {
        let mut state = self.write();
        let existing = state
            .members
            .find(id)
            .cloned()
            .ok_or_else(|| ActionError::MemberNotFound(id.to_string()))?;
        let name = validate_member_name(&state.members, &draft.name, Some(id))?;
        let member = draft.apply(&existing, name);

        self.store.save_member(&member)?;
        state.members.upsert(member.clone());

        self.event_bus.emit(topics::MEMBERS_CHANGED, &json!({ "id": id }));
        Ok(member)
    }

    pub fn delete_member(&self, id: &str) -> Result<Persona, ActionError> {
        let mut state = self.write();
        if !state.members.contains(id) {
            return Err(ActionError::MemberNotFound(id.to_string()));
        }

        self.store.delete_member(id)?;
        let removed = state
            .members
            .remove(id)
            .ok_or_else(|| ActionError::MemberNotFound(id.to_string()))?;
        state.members.select_after_removal(id);
        self.store
            .save_current_member(state.members.current_member_id.as_deref())?;

        log::info!("Deleted member {} ({id})", removed.name);
        self.event_bus.emit(topics::MEMBERS_CHANGED, &json!({ "id": id, "deleted": true }));
        Ok(removed)
    }

    /// Make `id` the fronting persona.
    pub fn switch_member(&self, id: &str) -> Result<Persona, ActionError> {
        let mut state = self.write();
        if !state.members.switch_to(id) {
            return Err(ActionError::MemberNotFound(id.to_string()));
        }
        self.store.save_current_member(Some(id))?;

        self.event_bus.emit(topics::CURRENT_MEMBER_CHANGED, &json!({ "id": id }));
        state
            .members
            .current()
            .cloned()
            .ok_or_else(|| ActionError::MemberNotFound(id.to_string()))
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    /// Create a conversation and open it.
    pub fn create_conversation(&self, name: &str) -> Result<Conversation, ActionError> {
        let name = validate_conversation_name(name)?;
        let conversation = Conversation::new(self.ids.next_id(), name);

        let mut state = self.write();
        self.store.save_conversation(&conversation)?;
        state.conversations.upsert(conversation.clone());
        state.conversations.select(conversation.id.clone());
        self.store.save_current_conversation(Some(&conversation.id))?;

        log::info!("Created conversation {} ({})", conversation.name, conversation.id);
        self.event_bus
            .emit(topics::CONVERSATIONS_CHANGED, &json!({ "id": conversation.id }));
        Ok(conversation)
    }

    pub fn rename_conversation(&self, id: &str, name: &str) -> Result<Conversation, ActionError> {
        let name = validate_conversation_name(name)?;

        let mut state = self.write();
        let renamed = state
            .conversations
            .find(id)
            .map(|c| c.with_name(name))
            .ok_or_else(|| ActionError::ConversationNotFound(id.to_string()))?;

        self.store.save_conversation(&renamed)?;
        state.conversations.upsert(renamed.clone());

        self.event_bus.emit(topics::CONVERSATIONS_CHANGED, &json!({ "id": id }));
        Ok(renamed)
    }

    /// Delete a conversation with its messages. If it was open, the first
    /// remaining conversation is opened instead.
    pub fn delete_conversation(&self, id: &str) -> Result<Conversation, ActionError> {
        let mut state = self.write();
        if !state.conversations.contains(id) {
            return Err(ActionError::ConversationNotFound(id.to_string()));
        }

        self.store.delete_conversation(id)?;
        let removed = state
            .conversations
            .remove(id)
            .ok_or_else(|| ActionError::ConversationNotFound(id.to_string()))?;
        state.conversations.select_after_removal(id);
        self.store
            .save_current_conversation(state.conversations.current_conversation_id.as_deref())?;

        log::info!("Deleted conversation {} ({id})", removed.name);
        self.event_bus
            .emit(topics::CONVERSATIONS_CHANGED, &json!({ "id": id, "deleted": true }));
        Ok(removed)
    }

    pub fn select_conversation(&self, id: &str) -> Result<(), ActionError> {
        let mut state = self.write();
        if !state.conversations.contains(id) {
            return Err(ActionError::ConversationNotFound(id.to_string()));
        }
        state.conversations.select(id);
        self.store.save_current_conversation(Some(id))?;

        self.event_bus
            .emit(topics::CURRENT_CONVERSATION_CHANGED, &json!({ "id": id }));
        Ok(())
    }

    /// Send `content` as the current member into the current conversation.
    ///
    /// The sender is stored as a copy of the persona as it is right now.
    pub fn send_message(&self, content: &str) -> Result<Message, ActionError> {
        if content.trim().is_empty() {
            return Err(ActionError::EmptyMessage);
        }

        let mut state = self.write();
        let sender = state
            .members
            .current()
            .cloned()
            .ok_or(ActionError::NoCurrentMember)?;
        let conversation_id = state
            .conversations
            .current()
            .map(|c| c.id.clone())
            .ok_or(ActionError::NoCurrentConversation)?;

        let message = Message::new(self.ids.next_id(), self.clock.now(), sender, content);
        self.store.append_message(&conversation_id, &message)?;
        let updated = state
            .conversations
            .append_message(&conversation_id, message.clone())
            .ok_or_else(|| ActionError::ConversationNotFound(conversation_id.clone()))?;
        self.store.save_conversation(updated)?;

        self.event_bus.emit(
            topics::MESSAGE_SENT,
            &json!({ "conversationId": conversation_id, "messageId": message.id }),
        );
        let policy = NotificationPolicy::from_settings(&state.settings);
        if let Some(notification) = policy.new_message(&message) {
            policy.publish(&self.event_bus, &notification);
        }

        Ok(message)
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search_messages(&self.read().conversations.conversations, query)
    }

    // ------------------------------------------------------------------------
    // Import / export
    // ------------------------------------------------------------------------

    pub fn export_bundle(
        &self,
        path: &Path,
        selection: ExportSelection,
    ) -> Result<ExportSummary, ActionError> {
        Ok(bundle::export_bundle(
            path,
            &self.read(),
            selection,
            self.clock.now(),
        )?)
    }

    pub fn preview_bundle(&self, path: &Path) -> Result<BundlePreview, ActionError> {
        Ok(bundle::preview_bundle(path)?)
    }

    pub fn import_bundle(&self, path: &Path, mode: ImportMode) -> Result<ImportSummary, ActionError> {
        let mut state = self.write();
        let summary = bundle::import_bundle(path, mode, &mut state, &self.store)?;

        self.event_bus.emit(
            topics::DATA_RELOADED,
            &json!({ "import": mode.as_str(), "members": summary.members, "conversations": summary.conversations }),
        );
        let policy = NotificationPolicy::from_settings(&state.settings);
        if let Some(notification) = policy.system(&summary.status_message()) {
            policy.publish(&self.event_bus, &notification);
        }
        Ok(summary)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    pub fn update_settings(&self, settings: AppSettings) -> Result<AppSettings, ActionError> {
        let settings = settings.clamped();
        let mut state = self.write();
        self.store.save_settings(&settings)?;
        state.settings = settings.clone();

        self.event_bus.emit(topics::SETTINGS_CHANGED, &settings);
        Ok(settings)
    }

    pub fn set_theme(&self, theme_index: usize) -> Result<AppSettings, ActionError> {
        let mut state = self.write();
        let stored = self.store.save_theme_preference(theme_index)?;
        state.settings.theme_index = stored.theme_index;

        self.event_bus.emit(topics::SETTINGS_CHANGED, &state.settings);
        Ok(state.settings.clone())
    }
}
