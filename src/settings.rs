//! Client-local retrieval/generation settings
//!
//! A flat record of tuning values and display flags, persisted as a single
//! JSON blob in the user's data directory. The blob is read lazily on
//! first use, merged over defaults (fields absent from storage keep their
//! default), and written back in full on every update.

use std::path::PathBuf;

use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{AskdeskError, Result};

/// File name of the settings blob inside the askdesk data directory.
const SETTINGS_FILE: &str = "settings.json";

/// Environment variable overriding the settings blob location.
///
/// Points the binary at a test file or alternate profile without touching
/// the user's data directory.
const SETTINGS_PATH_ENV: &str = "ASKDESK_SETTINGS_PATH";

/// Retrieval/generation tuning values and display flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of retrieval results used per question
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Diversity/relevance balance for retrieval (0.0 = diverse, 1.0 = relevant)
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f64,

    /// Generation temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Render inline images in answers
    #[serde(default = "default_show_images")]
    pub show_images: bool,

    /// Use the compact message layout
    #[serde(default)]
    pub compact_layout: bool,
}

fn default_top_k() -> u32 {
    8
}

fn default_mmr_lambda() -> f64 {
    0.5
}

fn default_temperature() -> f64 {
    0.2
}

fn default_show_images() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            mmr_lambda: default_mmr_lambda(),
            temperature: default_temperature(),
            show_images: default_show_images(),
            compact_layout: false,
        }
    }
}

/// Lazy, write-through store for the settings blob.
pub struct SettingsStore {
    path: PathBuf,
    cached: Option<Settings>,
}

impl SettingsStore {
    /// Create a store over the default blob location.
    ///
    /// Honors the `ASKDESK_SETTINGS_PATH` override, otherwise resolves the
    /// platform data directory.
    ///
    /// # Errors
    ///
    /// Returns an error when no data directory can be determined.
    pub fn new() -> Result<Self> {
        if let Ok(override_path) = std::env::var(SETTINGS_PATH_ENV) {
            return Ok(Self::with_path(override_path));
        }

        let proj_dirs = ProjectDirs::from("com", "askdesk", "askdesk")
            .ok_or_else(|| AskdeskError::Settings("Could not determine data directory".into()))?;
        Ok(Self::with_path(proj_dirs.data_dir().join(SETTINGS_FILE)))
    }

    /// Create a store over an explicit blob path.
    ///
    /// Primarily useful for tests with a temporary directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use askdesk::settings::SettingsStore;
    ///
    /// let mut store = SettingsStore::with_path("/tmp/askdesk_settings.json");
    /// let settings = store.get();
    /// assert_eq!(settings.top_k, 8);
    /// ```
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    /// Current settings, loading the blob on first access.
    ///
    /// A missing blob yields defaults; fields absent from a stored blob
    /// fall back to their defaults through serde. Read failures degrade to
    /// defaults with a warning so settings never block a send.
    pub fn get(&mut self) -> Settings {
        if let Some(cached) = &self.cached {
            return cached.clone();
        }
        let loaded = self.read_blob().unwrap_or_else(|e| {
            tracing::warn!("Failed to read settings, using defaults: {:#}", e);
            Settings::default()
        });
        self.cached = Some(loaded.clone());
        loaded
    }

    /// Replace the settings, writing the full blob through to disk.
    ///
    /// # Errors
    ///
    /// Returns an error when the blob cannot be serialized or written; the
    /// in-memory value is only updated on a successful write.
    pub fn update(&mut self, settings: Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create settings directory")
                .map_err(|e| AskdeskError::Settings(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings")
            .map_err(|e| AskdeskError::Settings(e.to_string()))?;
        std::fs::write(&self.path, json)
            .context("Failed to write settings blob")
            .map_err(|e| AskdeskError::Settings(e.to_string()))?;
        self.cached = Some(settings);
        Ok(())
    }

    fn read_blob(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let contents = std::fs::read_to_string(&self.path)
            .context("Failed to read settings blob")
            .map_err(|e| AskdeskError::Settings(e.to_string()))?;
        let settings = serde_json::from_str(&contents)
            .context("Failed to parse settings blob")
            .map_err(|e| AskdeskError::Settings(e.to_string()))?;
        Ok(settings)
    }
}
