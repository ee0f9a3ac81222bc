//! Crate-level error type.
//!
//! Tag scanning and reconciliation never fail; errors only arise at the
//! edges, when loading settings or reading and writing documents.

use crate::config::SettingsError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
