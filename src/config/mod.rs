//! Configuration module.
//!
//! Handles settings loading and defaults.

mod settings;

pub use settings::{EngineSettings, ParameterSettings, Settings, SettingsError, SnippetSettings};
