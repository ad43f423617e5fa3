//! Configuration management for askme.
//!
//! Loads configuration from ${ASKME_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template stay present while the user's
/// customized values win.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for askme configuration and data.
    //!
    //! ASKME_HOME resolution order:
    //! 1. ASKME_HOME environment variable (if set)
    //! 2. ~/.config/askme (default)
    //! 3. ./.askme when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the askme home directory.
    pub fn askme_home() -> PathBuf {
        if let Ok(home) = std::env::var("ASKME_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".askme"),
            |h| h.join(".config").join("askme"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        askme_home().join("config.toml")
    }

    /// Returns the path to the local blob store (history + theme).
    pub fn state_path() -> PathBuf {
        askme_home().join("state.json")
    }

    /// Returns the log directory.
    pub fn logs_dir() -> PathBuf {
        askme_home().join("logs")
    }
}

/// Gemini endpoint settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// API key (falls back to `GEMINI_API_KEY`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl GeminiSettings {
    /// Returns the configured API key, ignoring blank values.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Returns the configured base URL, ignoring blank values.
    pub fn effective_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

/// Speech input/output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
    /// Text-to-speech program (autodetected when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_command: Option<String>,
    /// Speech-to-text program printing the transcript on stdout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_command: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locale: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
            output_command: None,
            input_command: None,
        }
    }
}

/// Answer display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Language tag for fenced blocks created around code-like answers.
    pub code_language: String,
    /// Delay before scrolling to the newest answer.
    pub scroll_delay_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            code_language: crate::answer::DEFAULT_CODE_LANGUAGE.to_string(),
            scroll_delay_ms: 500,
        }
    }
}

impl DisplayConfig {
    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: "askme.log".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The Gemini model to use
    pub model: String,

    /// Timeout for the outbound request in seconds (0 disables)
    pub request_timeout_secs: u32,

    #[serde(default)]
    pub gemini: GeminiSettings,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Self::DEFAULT_MODEL.to_string(),
            request_timeout_secs: 0,
            gemini: GeminiSettings::default(),
            speech: SpeechConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_MODEL: &str = "gemini-2.0-flash";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Sets a single (optionally dotted) key in the config file.
    ///
    /// Creates the file from the template if it doesn't exist and preserves
    /// comments and other fields otherwise. The raw value is stored as a
    /// bool, integer or float when it parses as one, else as a string.
    ///
    /// # Errors
    /// Returns an error if the key is empty, the resulting file would not
    /// load as a valid config, or the write fails.
    pub fn set_value_in(path: &Path, key: &str, raw: &str) -> Result<()> {
        use toml_edit::{DocumentMut, Item, Table};

        let segments: Vec<&str> = key.split('.').map(str::trim).collect();
        if segments.iter().any(|s| s.is_empty()) {
            anyhow::bail!("Invalid config key '{key}'");
        }

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        let (leaf, parents) = segments
            .split_last()
            .context("config key must not be empty")?;
        let mut table = doc.as_table_mut();
        for segment in parents {
            if !table.contains_key(segment) {
                table.insert(segment, Item::Table(Table::new()));
            }
            table = table[*segment]
                .as_table_mut()
                .with_context(|| format!("'{segment}' is not a table in {key}"))?;
        }
        table[*leaf] = toml_edit::value(parse_scalar(raw));

        let rendered = doc.to_string();
        toml::from_str::<Config>(&rendered)
            .with_context(|| format!("'{raw}' is not a valid value for {key}"))?;

        Self::write_config(path, &rendered)
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

fn parse_scalar(raw: &str) -> toml_edit::Value {
    let trimmed = raw.trim();
    if let Ok(b) = trimmed.parse::<bool>() {
        return b.into();
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return i.into();
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return f.into();
    }
    trimmed.into()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.request_timeout_secs, 0);
        assert!(config.speech.enabled);
        assert_eq!(config.speech.locale, "en-US");
        assert_eq!(config.display.code_language, "javascript");
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "model = \"gemini-2.5-pro\"\n[speech]\nenabled = false\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.locale, "en-US");
        assert_eq!(config.display.scroll_delay_ms, 500);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let from_template: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(from_template.model, defaults.model);
        assert_eq!(from_template.display.code_language, defaults.display.code_language);
        assert_eq!(from_template.logging.file, defaults.logging.file);
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("gemini-2.0-flash"));
        assert!(contents.contains("# api_key ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_request_timeout_zero_disables() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), None);

        let config = Config {
            request_timeout_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let settings = GeminiSettings {
            api_key: Some("   ".to_string()),
            base_url: Some(" http://localhost:1234 ".to_string()),
        };
        assert_eq!(settings.effective_api_key(), None);
        assert_eq!(settings.effective_base_url(), Some("http://localhost:1234"));
    }

    #[test]
    fn test_set_value_creates_file_with_template() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        Config::set_value_in(&config_path, "speech.enabled", "false").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(!config.speech.enabled);

        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("# askme Configuration"));
    }

    #[test]
    fn test_set_value_preserves_other_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "model = \"gemini-2.5-flash\"\n[display]\nscroll_delay_ms = 250\n",
        )
        .unwrap();

        Config::set_value_in(&config_path, "display.code_language", "python").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.display.scroll_delay_ms, 250);
        assert_eq!(config.display.code_language, "python");
    }

    #[test]
    fn test_set_value_rejects_wrong_type() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        let result = Config::set_value_in(&config_path, "request_timeout_secs", "soon");
        assert!(result.is_err());
        assert!(!config_path.exists());
    }

    #[test]
    fn test_set_value_rejects_empty_segment() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        assert!(Config::set_value_in(&config_path, "speech..rate", "1.5").is_err());
    }
}
