//! In-memory registries of members and conversations.
//!
//! The registries are the live working set a UI reads and writes. Each one
//! is an ordered `Vec` plus a "current" pointer. The pointer is a plain id
//! with no foreign-key check: it may name an entry that no longer exists,
//! and every reader treats that as "nothing selected".

use thiserror::Error;

use crate::model::{Conversation, Message, Persona};

/// Longest display name accepted by the edit-time checks, in characters.
pub const MAX_NAME_CHARS: usize = 50;

/// Why a proposed display name was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("Name cannot be empty")]
    Empty,

    #[error("Name cannot be longer than {} characters", MAX_NAME_CHARS)]
    TooLong,

    #[error("Name is already used by another member: {0}")]
    Taken(String),
}

// ============================================================================
// Members
// ============================================================================

/// All known personas and the currently fronting one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberRegistry {
    /// Personas in display order.
    pub members: Vec<Persona>,

    /// The selected persona id. May be stale.
    pub current_member_id: Option<String>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Persona> {
        self.members.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.id.clone()).collect()
    }

    /// Find a persona by id.
    pub fn find(&self, id: &str) -> Option<&Persona> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Add or replace a persona.
    ///
    /// An existing entry with the same id is replaced in place so display
    /// order is kept; a new id is appended. Returns `true` on replace.
    pub fn upsert(&mut self, member: Persona) -> bool {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(slot) => {
                *slot = member;
                true
            }
            None => {
                self.members.push(member);
                false
            }
        }
    }

    /// Remove a persona. The selection pointer is left alone.
    pub fn remove(&mut self, id: &str) -> Option<Persona> {
        let index = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(index))
    }

    /// The selected persona, if the pointer resolves.
    pub fn current(&self) -> Option<&Persona> {
        self.current_member_id
            .as_deref()
            .and_then(|id| self.find(id))
    }

    /// Point the selection at `id` without checking that it exists.
    pub fn select(&mut self, id: impl Into<String>) {
        self.current_member_id = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.current_member_id = None;
    }

    /// Make `id` the fronting member.
    ///
    /// Returns `false` and leaves the selection untouched when the id is
    /// unknown.
    pub fn switch_to(&mut self, id: &str) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.select(id);
        self.refresh_current_flags();
        true
    }

    /// Recompute each persona's `is_current` hint from the selection pointer.
    pub fn refresh_current_flags(&mut self) {
        let current = self.current_member_id.clone();
        self.members = self
            .members
            .iter()
            .map(|m| m.with_current(current.as_deref() == Some(m.id.as_str())))
            .collect();
    }

    /// After removing `removed_id`, fall back to the first remaining member
    /// if it was selected.
    pub fn select_after_removal(&mut self, removed_id: &str) {
        if self.current_member_id.as_deref() == Some(removed_id) {
            self.current_member_id = self.members.first().map(|m| m.id.clone());
            self.refresh_current_flags();
        }
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.current_member_id = None;
    }

    /// Whether another member (not `editing_id`) already uses `name`.
    pub fn name_taken(&self, name: &str, editing_id: Option<&str>) -> bool {
        self.members
            .iter()
            .any(|m| m.name == name && Some(m.id.as_str()) != editing_id)
    }
}

// ============================================================================
// Conversations
// ============================================================================

/// All conversations and the one currently open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationRegistry {
    /// Conversations in display order.
    pub conversations: Vec<Conversation>,

    /// The selected conversation id. May be stale.
    pub current_conversation_id: Option<String>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Conversation> {
        self.conversations.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.conversations.iter().map(|c| c.id.clone()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Add or replace a conversation, keeping the position of an existing id.
    pub fn upsert(&mut self, conversation: Conversation) -> bool {
        match self
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(slot) => {
                *slot = conversation;
                true
            }
            None => {
                self.conversations.push(conversation);
                false
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| c.id == id)?;
        Some(self.conversations.remove(index))
    }

    pub fn current(&self) -> Option<&Conversation> {
        self.current_conversation_id
            .as_deref()
            .and_then(|id| self.find(id))
    }

    pub fn select(&mut self, id: impl Into<String>) {
        self.current_conversation_id = Some(id.into());
    }

    pub fn clear_selection(&mut self) {
        self.current_conversation_id = None;
    }

    /// Replace conversation `id` with a copy that has `message` appended.
    ///
    /// Returns the new conversation, or `None` if the id is unknown.
    pub fn append_message(&mut self, id: &str, message: Message) -> Option<&Conversation> {
        let slot = self.conversations.iter_mut().find(|c| c.id == id)?;
        *slot = slot.with_message(message);
        Some(&*slot)
    }

    /// Replace conversation `id` with a renamed copy. Returns `false` if unknown.
    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        match self.conversations.iter_mut().find(|c| c.id == id) {
            Some(slot) => {
                *slot = slot.with_name(name);
                true
            }
            None => false,
        }
    }

    /// After deleting `removed_id`: if it was selected, select the first
    /// remaining conversation, or nothing when none remain.
    pub fn select_after_removal(&mut self, removed_id: &str) {
        if self.current_conversation_id.as_deref() == Some(removed_id) {
            self.current_conversation_id = self.conversations.first().map(|c| c.id.clone());
        }
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
        self.current_conversation_id = None;
    }

    pub fn message_count(&self) -> usize {
        self.conversations.iter().map(|c| c.messages.len()).sum()
    }
}

// ============================================================================
// Edit-time name checks
// ============================================================================

fn check_length(name: &str) -> Result<String, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(NameError::TooLong);
    }
    Ok(trimmed.to_string())
}

/// Validate a member name for create (`editing_id = None`) or rename.
///
/// Returns the trimmed name. Uniqueness is only enforced here; the store
/// accepts duplicates.
pub fn validate_member_name(
    registry: &MemberRegistry,
    name: &str,
    editing_id: Option<&str>,
) -> Result<String, NameError> {
    let trimmed = check_length(name)?;
    if registry.name_taken(&trimmed, editing_id) {
        return Err(NameError::Taken(trimmed));
    }
    Ok(trimmed)
}

/// Validate a conversation name. Duplicates are allowed.
pub fn validate_conversation_name(name: &str) -> Result<String, NameError> {
    check_length(name)
}

// ============================================================================
// TESTS
// ============================================================================
