//! The data store: durable home of members, conversations, and messages.
//!
//! `DataStore` binds the directory-scoped functions in
//! [`crate::persistence`] to one data directory and serializes writes per
//! entity directory. It also owns the two whole-state sequences:
//! [`DataStore::save_all`] and [`DataStore::load_all`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::model::{Conversation, Message, Persona};
use crate::paths::resolve_data_dir;
use crate::persistence::codec::{list_json_files, remove_dir_if_exists, remove_file_if_exists};
use crate::persistence::{
    self, AppSettings, LoadError, LoadReport, StorageError, CURRENT_CONVERSATION_FILE,
    CURRENT_MEMBER_FILE, SETTINGS_FILE,
};
use crate::state::AppState;

const MEMBERS_DIR: &str = "members";
const CONVERSATIONS_DIR: &str = "conversations";
const MESSAGES_DIR: &str = "messages";

/// One step of [`DataStore::save_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStep {
    Members,
    Conversations,
    Messages,
    CurrentMember,
    CurrentConversation,
}

impl fmt::Display for SaveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveStep::Members => "members",
            SaveStep::Conversations => "conversations",
            SaveStep::Messages => "messages",
            SaveStep::CurrentMember => "current member",
            SaveStep::CurrentConversation => "current conversation",
        };
        f.write_str(name)
    }
}

/// Outcome of [`DataStore::save_all`]. Saving is best effort per entity:
/// every failed write is recorded and the remaining writes still run.
#[derive(Debug, Default)]
pub struct SaveAllReport {
    pub failures: Vec<(SaveStep, StorageError)>,
}

impl SaveAllReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Steps with at least one failure, in step order.
    pub fn failed_steps(&self) -> Vec<SaveStep> {
        let mut steps: Vec<SaveStep> = Vec::new();
        for (step, _) in &self.failures {
            if !steps.contains(step) {
                steps.push(*step);
            }
        }
        steps
    }

    /// The first failure, if any. Later failures were already logged.
    pub fn into_result(self) -> Result<(), StorageError> {
        match self.failures.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }
}

/// Outcome of [`DataStore::load_all`].
#[derive(Debug, Default)]
pub struct LoadAllOutcome {
    /// Whether any member or conversation was found on disk.
    pub found: bool,
    pub members_loaded: usize,
    pub conversations_loaded: usize,
    pub messages_loaded: usize,

    /// Files that were skipped, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl LoadAllOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// File-backed store rooted at one data directory.
///
/// `DataStore` is `Send + Sync`. Writes to the same directory are
/// serialized by a per-directory lock.
#[derive(Debug)]
pub struct DataStore {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DataStore {
    /// Open (and create if needed) a store at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        };

        for dir in [
            store.members_dir(),
            store.conversations_dir(),
            store.messages_root(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }

        log::debug!("Opened data store at {}", store.root.display());
        Ok(store)
    }

    /// Open the store at the default data directory.
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(resolve_data_dir(None)?)
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn members_dir(&self) -> PathBuf {
        self.root.join(MEMBERS_DIR)
    }

    pub fn conversations_dir(&self) -> PathBuf {
        self.root.join(CONVERSATIONS_DIR)
    }

    pub fn messages_root(&self) -> PathBuf {
        self.root.join(MESSAGES_DIR)
    }

    pub fn messages_dir(&self, conversation_id: &str) -> Result<PathBuf, StorageError> {
        persistence::message_dir(&self.messages_root(), conversation_id)
    }

    pub fn current_member_path(&self) -> PathBuf {
        self.root.join(CURRENT_MEMBER_FILE)
    }

    pub fn current_conversation_path(&self) -> PathBuf {
        self.root.join(CURRENT_CONVERSATION_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    // ------------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------------

    fn dir_lock(&self, dir: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(dir.to_path_buf()).or_default())
    }

    /// Drop lock entries for `dir` and everything below it.
    fn forget_dir_locks(&self, dir: &Path) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|path, _| !path.starts_with(dir));
    }

    /// Run `f` while holding the write lock for `dir`.
    fn with_dir_lock<T>(&self, dir: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.dir_lock(dir);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------

    pub fn save_member(&self, member: &Persona) -> Result<(), StorageError> {
        let dir = self.members_dir();
        self.with_dir_lock(&dir, || persistence::save_member(&dir, member))
    }

    pub fn load_member(&self, id: &str) -> Result<Option<Persona>, LoadError> {
        persistence::load_member(&self.members_dir(), id)
    }

    pub fn delete_member(&self, id: &str) -> Result<(), StorageError> {
        let dir = self.members_dir();
        self.with_dir_lock(&dir, || persistence::delete_member(&dir, id))
    }

    pub fn load_members(&self) -> LoadReport<Persona> {
        persistence::load_all_members(&self.members_dir())
    }

    // ------------------------------------------------------------------------
    // Conversations
    // ------------------------------------------------------------------------

    /// Save a conversation header. Messages are stored separately.
    pub fn save_conversation(&self, conversation: &Conversation) -> Result<(), StorageError> {
        let dir = self.conversations_dir();
        self.with_dir_lock(&dir, || persistence::save_conversation(&dir, conversation))
    }

    /// Load a conversation header (no messages attached).
    pub fn load_conversation(&self, id: &str) -> Result<Option<Conversation>, LoadError> {
        persistence::load_conversation(&self.conversations_dir(), id)
    }

    /// Delete a conversation file and its whole message directory.
    ///
    /// Selection pointers are not touched.
    pub fn delete_conversation(&self, id: &str) -> Result<(), StorageError> {
        let dir = self.conversations_dir();
        self.with_dir_lock(&dir, || persistence::delete_conversation(&dir, id))?;

        let messages = self.messages_dir(id)?;
        self.with_dir_lock(&messages, || persistence::delete_messages(&messages))?;
        self.forget_dir_locks(&messages);
        Ok(())
    }

    pub fn load_conversations(&self) -> LoadReport<Conversation> {
        persistence::load_all_conversations(&self.conversations_dir())
    }

    // ------------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------------

    /// Replace every stored message of a conversation.
    pub fn save_messages(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), StorageError> {
        let dir = self.messages_dir(conversation_id)?;
        self.with_dir_lock(&dir, || persistence::save_messages(&dir, messages))
    }

    /// Append one message to a conversation. Returns its position.
    pub fn append_message(
        &self,
        conversation_id: &str,
        message: &Message,
    ) -> Result<u64, StorageError> {
        let dir = self.messages_dir(conversation_id)?;
        self.with_dir_lock(&dir, || persistence::append_message(&dir, message))
    }

    /// Load the messages of a conversation in stored order.
    ///
    /// An id that cannot name a directory has no messages.
    pub fn load_messages(&self, conversation_id: &str) -> LoadReport<Message> {
        match self.messages_dir(conversation_id) {
            Ok(dir) => persistence::load_messages(&dir),
            Err(err) => {
                log::warn!("No messages for conversation: {err}");
                LoadReport::new()
            }
        }
    }

    /// A conversation header with its stored messages attached.
    pub fn load_conversation_with_messages(
        &self,
        id: &str,
    ) -> Result<Option<Conversation>, LoadError> {
        Ok(self
            .load_conversation(id)?
            .map(|header| header.with_messages(self.load_messages(id).succeeded)))
    }

    // ------------------------------------------------------------------------
    // Selection pointers and settings
    // ------------------------------------------------------------------------

    pub fn save_current_member(&self, id: Option<&str>) -> Result<(), StorageError> {
        let path = self.current_member_path();
        self.with_dir_lock(&self.root, || persistence::save_pointer(&path, id))
    }

    pub fn save_current_conversation(&self, id: Option<&str>) -> Result<(), StorageError> {
        let path = self.current_conversation_path();
        self.with_dir_lock(&self.root, || persistence::save_pointer(&path, id))
    }

    /// The stored member pointer. Unreadable files count as "no selection".
    pub fn load_current_member(&self) -> Option<String> {
        read_pointer(&self.current_member_path())
    }

    pub fn load_current_conversation(&self) -> Option<String> {
        read_pointer(&self.current_conversation_path())
    }

    pub fn save_settings(&self, settings: &AppSettings) -> Result<(), StorageError> {
        let path = self.settings_path();
        self.with_dir_lock(&self.root, || persistence::save_settings(&path, settings))
    }

    pub fn load_settings(&self) -> AppSettings {
        persistence::load_settings(&self.settings_path())
    }

    /// Persist a new theme index, keeping the other stored settings.
    pub fn save_theme_preference(&self, theme_index: usize) -> Result<AppSettings, StorageError> {
        let path = self.settings_path();
        self.with_dir_lock(&self.root, || {
            persistence::save_theme_preference(&path, theme_index)
        })
    }

    // ------------------------------------------------------------------------
    // Whole-state sequences
    // ------------------------------------------------------------------------

    /// Persist the whole state.
    ///
    /// Five steps run in order: members, conversation headers, messages of
    /// every conversation, current member pointer, current conversation
    /// pointer. A failed entity is recorded and the rest are still written.
    /// Nothing is rolled back.
    pub fn save_all(&self, state: &AppState) -> SaveAllReport {
        let mut report = SaveAllReport::default();
        let mut record = |step: SaveStep, result: Result<(), StorageError>| {
            if let Err(err) = result {
                log::error!("Failed to save {step}: {err}");
                report.failures.push((step, err));
            }
        };

        for member in state.members.iter() {
            record(SaveStep::Members, self.save_member(member));
        }
        for conversation in state.conversations.iter() {
            record(SaveStep::Conversations, self.save_conversation(conversation));
        }
        for conversation in state.conversations.iter() {
            record(
                SaveStep::Messages,
                self.save_messages(&conversation.id, &conversation.messages),
            );
        }
        record(
            SaveStep::CurrentMember,
            self.save_current_member(state.members.current_member_id.as_deref()),
        );
        record(
            SaveStep::CurrentConversation,
            self.save_current_conversation(state.conversations.current_conversation_id.as_deref()),
        );

        if report.is_complete() {
            log::info!(
                "Saved {} members and {} conversations",
                state.members.len(),
                state.conversations.len()
            );
        }

        report
    }

    /// Replace `state` with what is on disk.
    ///
    /// Both registries are cleared first. Unreadable files are skipped and
    /// reported; this never fails.
    pub fn load_all(&self, state: &mut AppState) -> LoadAllOutcome {
        let mut outcome = LoadAllOutcome::default();

        state.members.clear();
        state.conversations.clear();

        let members = self.load_members().drain_into(&mut outcome.failed);
        let members_found = !members.is_empty();
        for member in members {
            state.members.upsert(member);
        }

        let headers = self.load_conversations().drain_into(&mut outcome.failed);
        let conversations_found = !headers.is_empty();
        for header in headers {
            let messages = self
                .load_messages(&header.id)
                .drain_into(&mut outcome.failed);
            outcome.messages_loaded += messages.len();
            state.conversations.upsert(header.with_messages(messages));
        }

        state.members.current_member_id = self.load_current_member();
        state.conversations.current_conversation_id = self.load_current_conversation();
        state.members.refresh_current_flags();
        state.settings = self.load_settings();

        outcome.found = members_found || conversations_found;
        outcome.members_loaded = state.members.len();
        outcome.conversations_loaded = state.conversations.len();

        log::info!(
            "Loaded {} members, {} conversations, {} messages ({} files skipped)",
            outcome.members_loaded,
            outcome.conversations_loaded,
            outcome.messages_loaded,
            outcome.failed.len()
        );

        outcome
    }

    /// Delete every conversation and message, on disk and in `state`.
    ///
    /// Members and settings are kept.
    pub fn clear_history(&self, state: &mut AppState) -> Result<(), StorageError> {
        let conversations = self.conversations_dir();
        self.with_dir_lock(&conversations, || {
            for path in list_json_files(&conversations)? {
                remove_file_if_exists(&path)?;
            }
            Ok::<_, StorageError>(())
        })?;

        let messages = self.messages_root();
        self.with_dir_lock(&messages, || {
            remove_dir_if_exists(&messages)?;
            std::fs::create_dir_all(&messages).map_err(|e| StorageError::io(&messages, e))
        })?;
        self.forget_dir_locks(&messages);

        state.conversations.clear();
        self.save_current_conversation(None)?;

        log::info!("Cleared conversation history");
        Ok(())
    }
}

fn read_pointer(path: &Path) -> Option<String> {
    persistence::load_pointer(path).unwrap_or_else(|err| {
        log::warn!("Ignoring selection pointer: {err}");
        None
    })
}

// ============================================================================
// TESTS
// ============================================================================
