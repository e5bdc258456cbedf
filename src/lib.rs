//! # Settings DB
//!
//! A grouped key-value settings store for Rust, backed by SQLite, with lazy
//! loading and write-through caching.
//!
//! ## Features
//!
//! - **Hierarchical keys**: '/'-separated paths with a stack of groups
//! - **Lazy loading**: opening only enumerates keys; values load on first read
//! - **Write-through**: every `set` reaches the store in the same call, or is
//!   batched until `sync` with the deferred write policy
//! - **Degrades gracefully**: if the store cannot be opened or a query fails,
//!   the database keeps working from memory and logs a warning
//! - **Statistics**: track cache hits, store reads and writes
//!
//! ## Quick Start
//!
//! ```rust
//! use settings_db::{SettingsConfig, SettingsDatabase, Value};
//!
//! let dir = std::env::temp_dir().join("settings-db-quickstart");
//! let mut settings = SettingsDatabase::open_with_config(
//!     &dir,
//!     "quickstart",
//!     SettingsConfig::new().file_extension("db").build(),
//! );
//!
//! settings.begin_group("window");
//! settings.set("width", 1280);
//! settings.set("maximized", false);
//! settings.end_group();
//!
//! assert_eq!(settings.get("window/width"), Some(Value::Int(1280)));
//! assert!(settings.contains("window"));
//!
//! settings.begin_group("window");
//! let keys = settings.child_keys();
//! assert!(keys.contains(&"width".to_string()));
//! settings.end_group();
//!
//! settings.remove("window");
//! assert!(!settings.contains("window"));
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod key;
pub mod settings;
pub mod stats;
pub mod storage;
pub mod value;

pub use cli::{Cli, SettingsCommand};
pub use config::{SettingsConfig, SyncMode, WritePolicy};
pub use error::{SettingsError, SettingsResult};
pub use settings::SettingsDatabase;
pub use stats::{SettingsStats, StatsSnapshot};
pub use storage::{KeyListing, Store};
pub use value::Value;

// Internal modules - not part of public API
pub(crate) mod cache;
pub(crate) mod entry;
