//! Import/export bundles.
//!
//! A bundle is one JSON document that carries any subset of members,
//! conversations (with their messages), and settings:
//!
//! ```json
//! {
//!   "format": "multichat-bundle",
//!   "version": 1,
//!   "exportDate": "2025-01-15T09:30:00Z",
//!   "appVersion": "0.1.0",
//!   "members": [ ... ],
//!   "conversations": [ ... ],
//!   "currentMemberId": "...",
//!   "currentConversationId": "...",
//!   "settings": { ... }
//! }
//! ```
//!
//! Absent categories are left untouched on import.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Conversation, Persona};
use crate::paths::validate_id;
use crate::persistence::{write_json, AppSettings, StorageError};
use crate::state::AppState;
use crate::store::DataStore;

/// Value of the `format` tag every bundle carries.
pub const BUNDLE_FORMAT: &str = "multichat-bundle";

/// Newest bundle version this build can read.
pub const BUNDLE_VERSION: u32 = 1;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bundle JSON in {}: {}", .path.display(), .source)]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown bundle format: {0:?}")]
    UnknownFormat(String),

    #[error("Bundle version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Nothing selected to export")]
    NothingSelected,

    #[error("Bundle contains a {kind} id that cannot be stored: {id:?}")]
    InvalidId { kind: &'static str, id: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl BundleError {
    /// One-line, user-facing description for status bars and toasts.
    pub fn status_message(&self) -> String {
        match self {
            BundleError::Io { path, .. } => format!("Could not read {}", path.display()),
            BundleError::Json { .. } => "The file is not valid JSON".to_string(),
            BundleError::UnknownFormat(_) => "The file is not a multichat export".to_string(),
            BundleError::UnsupportedVersion { .. } => {
                "The file was exported by a newer version of multichat".to_string()
            }
            BundleError::NothingSelected => "Select at least one category to export".to_string(),
            BundleError::InvalidId { .. } => "The file contains entries with invalid ids".to_string(),
            BundleError::Storage(err) => format!("Failed to save data: {err}"),
        }
    }
}

/// The on-disk bundle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub format: String,
    pub version: u32,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub app_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Persona>>,
    /// Conversations with their messages embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversations: Option<Vec<Conversation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<AppSettings>,
}

/// Just enough of a document to decide whether it is a bundle at all.
#[derive(Deserialize)]
struct BundleHeader {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    version: Option<u32>,
}

impl Bundle {
    /// Build a bundle from `state` with the selected categories.
    pub fn from_state(
        state: &AppState,
        selection: ExportSelection,
        now: DateTime<Utc>,
    ) -> Result<Self, BundleError> {
        if selection.is_empty() {
            return Err(BundleError::NothingSelected);
        }

        let mut bundle = Bundle {
            format: BUNDLE_FORMAT.to_string(),
            version: BUNDLE_VERSION,
            export_date: now,
            app_version: APP_VERSION.to_string(),
            members: None,
            conversations: None,
            current_member_id: None,
            current_conversation_id: None,
            settings: None,
        };

        if selection.members {
            bundle.members = Some(state.members.members.clone());
            bundle.current_member_id = state.members.current_member_id.clone();
        }
        if selection.conversations {
            bundle.conversations = Some(state.conversations.conversations.clone());
            bundle.current_conversation_id = state.conversations.current_conversation_id.clone();
        }
        if selection.settings {
            bundle.settings = Some(state.settings.clone());
        }

        Ok(bundle)
    }

    pub fn member_count(&self) -> usize {
        self.members.as_ref().map_or(0, Vec::len)
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations.as_ref().map_or(0, Vec::len)
    }

    pub fn message_count(&self) -> usize {
        self.conversations
            .iter()
            .flatten()
            .map(|c| c.messages.len())
            .sum()
    }

    /// Check that every member, conversation, and message id can name a file.
    pub fn validate_ids(&self) -> Result<(), BundleError> {
        let check = |kind: &'static str, id: &str| {
            validate_id(id).map_err(|_| BundleError::InvalidId {
                kind,
                id: id.to_string(),
            })
        };

        for member in self.members.iter().flatten() {
            check("member", &member.id)?;
        }
        for conversation in self.conversations.iter().flatten() {
            check("conversation", &conversation.id)?;
            for message in &conversation.messages {
                check("message", &message.id)?;
            }
        }
        Ok(())
    }
}

/// Which categories an export includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSelection {
    pub conversations: bool,
    pub members: bool,
    pub settings: bool,
}

impl ExportSelection {
    pub fn all() -> Self {
        Self {
            conversations: true,
            members: true,
            settings: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.conversations || self.members || self.settings)
    }
}

impl Default for ExportSelection {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub members: usize,
    pub conversations: usize,
    pub messages: usize,
    pub settings: bool,
}

impl ExportSummary {
    pub fn status_message(&self) -> String {
        format!(
            "Export complete: {} members, {} conversations, {} messages saved to {}",
            self.members,
            self.conversations,
            self.messages,
            self.path.display()
        )
    }
}

/// What a bundle holds, read without touching any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePreview {
    pub members: usize,
    pub conversations: usize,
    pub messages: usize,
    pub has_settings: bool,
    pub export_date: DateTime<Utc>,
    pub app_version: String,
}

/// How an import combines the bundle with current data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Upsert by id; nothing is removed.
    #[default]
    Merge,
    /// Discard each category present in the bundle, then take the bundle's.
    Replace,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Merge => "merge",
            ImportMode::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(ImportMode::Merge),
            "replace" => Ok(ImportMode::Replace),
            other => Err(format!("unknown import mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub mode: ImportMode,
    pub members: usize,
    pub conversations: usize,
    pub messages: usize,
    pub settings_applied: bool,

    /// Ids dropped by a replace import.
    pub removed_member_ids: Vec<String>,
    pub removed_conversation_ids: Vec<String>,
}

impl ImportSummary {
    pub fn status_message(&self) -> String {
        let verb = match self.mode {
            ImportMode::Merge => "merged into",
            ImportMode::Replace => "replaced",
        };
        format!(
            "Import complete: {} members and {} conversations {} the current data",
            self.members, self.conversations, verb
        )
    }
}

// ============================================================================
// Export
// ============================================================================

/// Write the selected parts of `state` to `path`.
pub fn export_bundle(
    path: &Path,
    state: &AppState,
    selection: ExportSelection,
    now: DateTime<Utc>,
) -> Result<ExportSummary, BundleError> {
    let bundle = Bundle::from_state(state, selection, now)?;
    write_json(path, &bundle)?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        members: bundle.member_count(),
        conversations: bundle.conversation_count(),
        messages: bundle.message_count(),
        settings: bundle.settings.is_some(),
    };
    log::info!("{}", summary.status_message());
    Ok(summary)
}

// ============================================================================
// Import
// ============================================================================

/// Read and validate a bundle file.
///
/// Rejects foreign documents, newer versions, and ids that cannot be used
/// as file names.
pub fn read_bundle(path: &Path) -> Result<Bundle, BundleError> {
    let contents = fs::read_to_string(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json_error = |source: serde_json::Error| BundleError::Json {
        path: path.to_path_buf(),
        source,
    };

    let header: BundleHeader = serde_json::from_str(&contents).map_err(json_error)?;
    match header.format.as_deref() {
        Some(BUNDLE_FORMAT) => {}
        other => return Err(BundleError::UnknownFormat(other.unwrap_or("").to_string())),
    }
    if let Some(found) = header.version {
        if found > BUNDLE_VERSION {
            return Err(BundleError::UnsupportedVersion {
                found,
                supported: BUNDLE_VERSION,
            });
        }
    }

    let bundle: Bundle = serde_json::from_str(&contents).map_err(json_error)?;
    bundle.validate_ids()?;
    Ok(bundle)
}

pub fn preview_bundle(path: &Path) -> Result<BundlePreview, BundleError> {
    let bundle = read_bundle(path)?;
    Ok(BundlePreview {
        members: bundle.member_count(),
        conversations: bundle.conversation_count(),
        messages: bundle.message_count(),
        has_settings: bundle.settings.is_some(),
        export_date: bundle.export_date,
        app_version: bundle.app_version,
    })
}

/// Apply a bundle to in-memory state only.
///
/// Merge upserts by id and adopts the bundle's selection only where the
/// current one does not resolve. Replace swaps out every category the
/// bundle carries, selection included. Settings are taken from the bundle
/// in both modes.
pub fn apply_bundle(bundle: Bundle, mode: ImportMode, state: &mut AppState) -> ImportSummary {
    let mut summary = ImportSummary {
        mode,
        messages: bundle.message_count(),
        ..ImportSummary::default()
    };

    if let Some(members) = bundle.members {
        summary.members = members.len();
        if mode == ImportMode::Replace {
            summary.removed_member_ids = state
                .members
                .iter()
                .filter(|old| !members.iter().any(|m| m.id == old.id))
                .map(|old| old.id.clone())
                .collect();
            state.members.clear();
        }
        for member in members {
            state.members.upsert(member);
        }

        let adopt = mode == ImportMode::Replace || state.members.current().is_none();
        if adopt {
            state.members.current_member_id = bundle.current_member_id;
        }
        state.members.refresh_current_flags();
    }

    if let Some(conversations) = bundle.conversations {
        summary.conversations = conversations.len();
        if mode == ImportMode::Replace {
            summary.removed_conversation_ids = state
                .conversations
                .iter()
                .filter(|old| !conversations.iter().any(|c| c.id == old.id))
                .map(|old| old.id.clone())
                .collect();
            state.conversations.clear();
        }
        for conversation in conversations {
            state.conversations.upsert(conversation);
        }

        let adopt = mode == ImportMode::Replace || state.conversations.current().is_none();
        if adopt {
            state.conversations.current_conversation_id = bundle.current_conversation_id;
        }
    }

    if let Some(settings) = bundle.settings {
        state.settings = settings.clamped();
        summary.settings_applied = true;
    }

    summary
}

/// Import a bundle file into `state` and persist the result.
///
/// The bundle is applied to a copy of `state`. The copy is saved first,
/// then files of entities dropped by a replace import are deleted, and only
/// then does the copy replace `state`. On error `state` is unchanged.
pub fn import_bundle(
    path: &Path,
    mode: ImportMode,
    state: &mut AppState,
    store: &DataStore,
) -> Result<ImportSummary, BundleError> {
    let bundle = read_bundle(path)?;
    log::info!(
        "Importing {} ({} members, {} conversations, mode {mode})",
        path.display(),
        bundle.member_count(),
        bundle.conversation_count()
    );

    let mut next = state.clone();
    let summary = apply_bundle(bundle, mode, &mut next);

    store.save_all(&next).into_result()?;
    if summary.settings_applied {
        store.save_settings(&next.settings)?;
    }

    for id in &summary.removed_member_ids {
        store.delete_member(id)?;
    }
    for id in &summary.removed_conversation_ids {
        store.delete_conversation(id)?;
    }

    *state = next;
    log::info!("{}", summary.status_message());
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
