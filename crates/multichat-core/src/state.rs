//! The in-memory application state.

use crate::persistence::AppSettings;
use crate::registry::{ConversationRegistry, MemberRegistry};

/// Everything one running application holds in memory.
///
/// A plain owned value. Callers thread it explicitly, or share it through
/// [`crate::context::AppContext`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub members: MemberRegistry,
    pub conversations: ConversationRegistry,
    pub settings: AppSettings,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when there is neither a member nor a conversation.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.conversations.is_empty()
    }
}
