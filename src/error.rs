//! Error types for the settings database.
//!
//! `Store` reports every failure through [`SettingsError`]. The
//! `SettingsDatabase` facade catches these at its boundary, logs them and
//! falls back to cache-only behavior, so callers of the facade never see them.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// The main error type for store operations.
#[derive(Debug)]
pub enum SettingsError {
    /// The store file could not be created or opened.
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// The `settings` table could not be created.
    Schema(rusqlite::Error),

    /// A single statement against the store failed.
    Query {
        op: &'static str,
        source: rusqlite::Error,
    },

    /// The directory for the store file could not be created.
    IoError(io::Error),

    /// The provided value is invalid (unparseable input, etc.).
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Open { path, source } => {
                write!(f, "failed to open settings store at {}: {}", path.display(), source)
            }
            SettingsError::Schema(err) => write!(f, "failed to prepare settings table: {}", err),
            SettingsError::Query { op, source } => write!(f, "{} failed: {}", op, source),
            SettingsError::IoError(err) => write!(f, "I/O error: {}", err),
            SettingsError::InvalidValue(reason) => write!(f, "invalid value: {}", reason),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Open { source, .. } => Some(source),
            SettingsError::Schema(err) => Some(err),
            SettingsError::Query { source, .. } => Some(source),
            SettingsError::IoError(err) => Some(err),
            SettingsError::InvalidValue(_) => None,
        }
    }
}

impl From<io::Error> for SettingsError {
    fn from(err: io::Error) -> Self {
        SettingsError::IoError(err)
    }
}

impl SettingsError {
    /// Wrap a statement failure with the name of the operation that issued it.
    pub(crate) fn query(op: &'static str) -> impl FnOnce(rusqlite::Error) -> SettingsError {
        move |source| SettingsError::Query { op, source }
    }
}

/// A specialized Result type for store operations.
pub type SettingsResult<T> = Result<T, SettingsError>;
