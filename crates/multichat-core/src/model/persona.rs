//! Persona ("consciousness") records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who may see what a persona writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyLevel {
    /// Visible to every member.
    #[default]
    Public,
    /// Visible inside the system only.
    Shared,
    /// Visible to the owning persona only.
    Private,
}

impl PrivacyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyLevel::Public => "PUBLIC",
            PrivacyLevel::Shared => "SHARED",
            PrivacyLevel::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PrivacyLevel::Public),
            "shared" => Ok(PrivacyLevel::Shared),
            "private" => Ok(PrivacyLevel::Private),
            other => Err(format!("Unknown privacy level: {other}")),
        }
    }
}

/// A member of the system.
///
/// Saved to `members/{id}.json`. Treated as an immutable record: edits
/// build a new value through the `with_*` methods and replace the old one
/// by id in the [`MemberRegistry`](crate::registry::MemberRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Unique persona identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Avatar resource reference, empty when unset.
    #[serde(default)]
    pub avatar_path: String,

    /// Short personality tags, in display order.
    #[serde(default)]
    pub personality_tags: Vec<String>,

    /// Free-form background notes.
    #[serde(default)]
    pub background_memory: String,

    /// UI hint only. The selection pointer in the registry is authoritative.
    #[serde(default)]
    pub is_current: bool,

    #[serde(default)]
    pub privacy_level: PrivacyLevel,
}

impl Persona {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_path: String::new(),
            personality_tags: Vec::new(),
            background_memory: String::new(),
            is_current: false,
            privacy_level: PrivacyLevel::Public,
        }
    }

    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    pub fn with_avatar_path(&self, avatar_path: impl Into<String>) -> Self {
        Self {
            avatar_path: avatar_path.into(),
            ..self.clone()
        }
    }

    pub fn with_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            personality_tags: tags.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    pub fn with_background_memory(&self, memory: impl Into<String>) -> Self {
        Self {
            background_memory: memory.into(),
            ..self.clone()
        }
    }

    pub fn with_privacy_level(&self, privacy_level: PrivacyLevel) -> Self {
        Self {
            privacy_level,
            ..self.clone()
        }
    }

    pub fn with_current(&self, is_current: bool) -> Self {
        Self {
            is_current,
            ..self.clone()
        }
    }
}

/// Split a comma separated tag string the way the member editor does.
///
/// Blank entries are dropped and surrounding whitespace is trimmed.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_with_override_keeps_other_fields() {
        let original = Persona::new("p-1", "Ash")
            .with_tags(["calm", "curious"])
            .with_privacy_level(PrivacyLevel::Shared);

        let renamed = original.with_name("Birch");

        assert_eq!(renamed.id, "p-1");
        assert_eq!(renamed.name, "Birch");
        assert_eq!(renamed.personality_tags, vec!["calm", "curious"]);
        assert_eq!(renamed.privacy_level, PrivacyLevel::Shared);
        assert_eq!(original.name, "Ash");
    }

    #[test]
    fn privacy_level_serializes_upper_case() {
        let json = serde_json::to_string(&PrivacyLevel::Private).unwrap();
        assert_eq!(json, "\"PRIVATE\"");

        let parsed: PrivacyLevel = serde_json::from_str("\"SHARED\"").unwrap();
        assert_eq!(parsed, PrivacyLevel::Shared);
    }

    #[test]
    fn privacy_level_parses_any_case() {
        assert_eq!("public".parse::<PrivacyLevel>(), Ok(PrivacyLevel::Public));
        assert_eq!("Private".parse::<PrivacyLevel>(), Ok(PrivacyLevel::Private));
        assert!("secret".parse::<PrivacyLevel>().is_err());
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let parsed: Persona = serde_json::from_str(r#"{"id": "p-1", "name": "Ash"}"#).unwrap();

        assert_eq!(parsed, Persona::new("p-1", "Ash"));
    }

    #[test]
    fn missing_required_field_fails() {
        let result = serde_json::from_str::<Persona>(r#"{"name": "Ash"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn camel_case_field_names() {
        let json = serde_json::to_string(&Persona::new("p-1", "Ash")).unwrap();

        assert!(json.contains("avatarPath"));
        assert!(json.contains("personalityTags"));
        assert!(json.contains("backgroundMemory"));
        assert!(json.contains("privacyLevel"));
        assert!(!json.contains("avatar_path"));
    }

    #[test]
    fn parse_tags_trims_and_drops_blanks() {
        assert_eq!(parse_tags(" calm, ,curious ,"), vec!["calm", "curious"]);
        assert!(parse_tags("").is_empty());
    }
}
