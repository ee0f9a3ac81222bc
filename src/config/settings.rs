//! TOML-based configuration.
//!
//! Example configuration (`native-query.toml`):
//! ```toml
//! [parameters]
//! feature = "native-parameters"  # database feature that enables tag tracking
//!
//! [engines]
//! table_required = ["mongo"]     # engines that need a collection selected
//!
//! [snippets]
//! max_sync_passes = 8            # cap on snippet rename/rescan passes
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::metadata::NATIVE_PARAMETERS_FEATURE;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Parameter tracking.
    pub parameters: ParameterSettings,

    /// Engine-specific behaviour.
    pub engines: EngineSettings,

    /// Snippet synchronization.
    pub snippets: SnippetSettings,
}

/// Parameter tracking settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParameterSettings {
    /// Database feature flag that enables template tag tracking.
    pub feature: String,
}

impl Default for ParameterSettings {
    fn default() -> Self {
        Self {
            feature: NATIVE_PARAMETERS_FEATURE.to_string(),
        }
    }
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engines whose native queries target a collection (table) as well as a
    /// database.
    pub table_required: Vec<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            table_required: vec!["mongo".to_string()],
        }
    }
}

impl EngineSettings {
    pub fn requires_table(&self, engine: &str) -> bool {
        self.table_required.iter().any(|e| e == engine)
    }
}

/// Snippet synchronization settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SnippetSettings {
    /// Upper bound on rewrite/rescan passes when snippet names change.
    pub max_sync_passes: usize,
}

impl Default for SnippetSettings {
    fn default() -> Self {
        Self { max_sync_passes: 8 }
    }
}

impl Settings {
    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `NATIVE_QUERY_CONFIG`
    /// 2. `./native-query.toml`
    /// 3. `~/.config/native-query/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("NATIVE_QUERY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("native-query.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("native-query").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.parameters.feature.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "parameters.feature must not be empty".to_string(),
            ));
        }
        if self.snippets.max_sync_passes == 0 {
            return Err(SettingsError::InvalidConfig(
                "snippets.max_sync_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
