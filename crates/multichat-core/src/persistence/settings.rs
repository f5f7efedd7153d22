//! Application settings.
//!
//! Stored at `<root>/settings.json`. Every key is optional on disk; missing
//! keys take their defaults so older files keep loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::codec::{read_json, write_json};
use super::error::StorageError;

pub const SETTINGS_FILE: &str = "settings.json";

/// Display names of the built-in themes, indexed by `theme_index`.
pub const THEME_NAMES: [&str; 5] = [
    "Default Blue",
    "Gentle Purple",
    "Natural Green",
    "Warm Orange",
    "Deep Night",
];

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub enable_animations: bool,
    pub enable_notifications: bool,
    pub enable_sound_effects: bool,
    pub font_size: u32,
    pub auto_save_enabled: bool,
    pub theme_index: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            enable_animations: true,
            enable_notifications: true,
            enable_sound_effects: false,
            font_size: 16,
            auto_save_enabled: true,
            theme_index: 0,
        }
    }
}

impl AppSettings {
    /// Theme index forced into the known range.
    pub fn clamped(mut self) -> Self {
        self.theme_index = clamp_theme_index(self.theme_index);
        self
    }

    pub fn theme_name(&self) -> &'static str {
        THEME_NAMES[clamp_theme_index(self.theme_index)]
    }
}

pub fn clamp_theme_index(index: usize) -> usize {
    index.min(THEME_NAMES.len() - 1)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), StorageError> {
    write_json(path, settings)
}

/// Load settings, falling back to defaults.
///
/// A missing file is silent; an unreadable one is logged.
pub fn load_settings(path: &Path) -> AppSettings {
    match read_json::<AppSettings>(path) {
        Ok(Some(settings)) => settings.clamped(),
        Ok(None) => AppSettings::default(),
        Err(err) => {
            log::warn!("Using default settings: {err}");
            AppSettings::default()
        }
    }
}

/// Persist only the theme choice, keeping every other stored setting.
pub fn save_theme_preference(path: &Path, theme_index: usize) -> Result<AppSettings, StorageError> {
    let settings = AppSettings {
        theme_index: clamp_theme_index(theme_index),
        ..load_settings(path)
    };
    save_settings(path, &settings)?;
    Ok(settings)
}
