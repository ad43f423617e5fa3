//! History/theme persistence adapters.
//!
//! `JsonBlobStore` keeps both values in one JSON object on disk:
//!
//! ```json
//! { "history": ["newest question", "older question"], "theme": "dark" }
//! ```
//!
//! Writes replace the whole file (temp file + rename). Two processes sharing
//! the same file can still lose each other's updates; last writer wins.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::model::ThemePreference;
use crate::ports::HistoryStore;

const HISTORY_KEY: &str = "history";
const THEME_KEY: &str = "theme";

/// File-backed store at `${ASKME_HOME}/state.json`.
#[derive(Debug, Clone)]
pub struct JsonBlobStore {
    path: PathBuf,
}

impl JsonBlobStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default state path.
    pub fn open_default() -> Self {
        Self::new(crate::config::paths::state_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_blob(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        match value {
            Value::Object(map) => Ok(map),
            _ => anyhow::bail!("{} does not contain a JSON object", self.path.display()),
        }
    }

    fn update_blob(&self, key: &str, value: Value) -> Result<()> {
        let mut blob = self.read_blob()?;
        blob.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let rendered = serde_json::to_string_pretty(&Value::Object(blob))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, rendered)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

impl HistoryStore for JsonBlobStore {
    fn load_history(&self) -> Result<Vec<String>> {
        let blob = self.read_blob()?;
        let Some(value) = blob.get(HISTORY_KEY) else {
            return Ok(Vec::new());
        };
        serde_json::from_value(value.clone())
            .with_context(|| format!("Malformed history in {}", self.path.display()))
    }

    fn save_history(&mut self, history: &[String]) -> Result<()> {
        self.update_blob(HISTORY_KEY, serde_json::to_value(history)?)
    }

    fn load_theme(&self) -> Result<ThemePreference> {
        let blob = self.read_blob()?;
        Ok(blob
            .get(THEME_KEY)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }

    fn save_theme(&mut self, theme: ThemePreference) -> Result<()> {
        self.update_blob(THEME_KEY, Value::String(theme.as_str().to_string()))
    }
}

/// In-memory store, used by tests and when persistence is unavailable.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub history: Vec<String>,
    pub theme: Option<ThemePreference>,
    pub history_writes: usize,
}

impl MemoryStore {
    pub fn with_history(history: Vec<String>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }
}

impl HistoryStore for MemoryStore {
    fn load_history(&self) -> Result<Vec<String>> {
        Ok(self.history.clone())
    }

    fn save_history(&mut self, history: &[String]) -> Result<()> {
        self.history = history.to_vec();
        self.history_writes += 1;
        Ok(())
    }

    fn load_theme(&self) -> Result<ThemePreference> {
        Ok(self.theme.unwrap_or_default())
    }

    fn save_theme(&mut self, theme: ThemePreference) -> Result<()> {
        self.theme = Some(theme);
        Ok(())
    }
}
