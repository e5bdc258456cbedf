//! Configuration for the settings database.
//!
//! This module provides a builder pattern for configuring the store file
//! name, durability, write policy and miss caching.

/// How hard SQLite tries to get each commit onto disk.
///
/// Maps directly onto `PRAGMA synchronous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Hand data to the OS and move on. A crash may lose the latest writes.
    #[default]
    Off,
    /// Sync at the most critical moments only.
    Normal,
    /// Sync on every commit.
    Full,
}

impl SyncMode {
    /// The pragma value for this mode.
    pub fn as_pragma(&self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
        }
    }
}

/// When writes reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Every `set` upserts its row before returning.
    #[default]
    Immediate,
    /// `set` only marks the key dirty; `sync` writes all dirty keys at once.
    Deferred,
}

/// Configuration for opening a settings database.
///
/// ```
/// use settings_db::{SettingsConfig, SyncMode, WritePolicy};
///
/// let config = SettingsConfig::new()
///     .file_extension("sqlite")
///     .synchronous(SyncMode::Normal)
///     .write_policy(WritePolicy::Deferred)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Extension of the store file, without the dot.
    pub(crate) file_extension: String,

    /// Durability of the underlying store.
    pub(crate) synchronous: SyncMode,

    /// Whether writes go straight through or wait for `sync`.
    pub(crate) write_policy: WritePolicy,

    /// Remember store misses so that repeated lookups skip the store.
    pub(crate) cache_misses: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            file_extension: "db".to_string(),
            synchronous: SyncMode::Off,
            write_policy: WritePolicy::Immediate,
            cache_misses: false,
        }
    }
}

impl SettingsConfig {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the extension of the store file.
    ///
    /// A leading dot is ignored; an empty extension falls back to `db`.
    pub fn file_extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        let ext = ext.trim_start_matches('.');
        self.file_extension = if ext.is_empty() {
            "db".to_string()
        } else {
            ext.to_string()
        };
        self
    }

    /// Set the store durability.
    pub fn synchronous(mut self, mode: SyncMode) -> Self {
        self.synchronous = mode;
        self
    }

    /// Set the write policy.
    pub fn write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Enable or disable caching of store misses.
    ///
    /// Only safe when nothing else writes to the same store file.
    pub fn cache_misses(mut self, enabled: bool) -> Self {
        self.cache_misses = enabled;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Self {
        self
    }

    /// Get the store file extension.
    pub fn get_file_extension(&self) -> &str {
        &self.file_extension
    }

    /// Get the store durability.
    pub fn get_synchronous(&self) -> SyncMode {
        self.synchronous
    }

    /// Get the write policy.
    pub fn get_write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Whether store misses are cached.
    pub fn get_cache_misses(&self) -> bool {
        self.cache_misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SettingsConfig::default();
        assert_eq!(config.file_extension, "db");
        assert_eq!(config.synchronous, SyncMode::Off);
        assert_eq!(config.write_policy, WritePolicy::Immediate);
        assert!(!config.cache_misses);
    }

    #[test]
    fn test_builder_pattern() {
        let config = SettingsConfig::new()
            .file_extension("sqlite")
            .synchronous(SyncMode::Full)
            .write_policy(WritePolicy::Deferred)
            .cache_misses(true)
            .build();

        assert_eq!(config.get_file_extension(), "sqlite");
        assert_eq!(config.get_synchronous(), SyncMode::Full);
        assert_eq!(config.get_write_policy(), WritePolicy::Deferred);
        assert!(config.get_cache_misses());
    }

    #[test]
    fn test_extension_normalization() {
        let config = SettingsConfig::new().file_extension(".ini").build();
        assert_eq!(config.file_extension, "ini");

        let config = SettingsConfig::new().file_extension("").build();
        assert_eq!(config.file_extension, "db");
    }

    #[test]
    fn test_sync_pragma_values() {
        assert_eq!(SyncMode::Off.as_pragma(), "OFF");
        assert_eq!(SyncMode::Normal.as_pragma(), "NORMAL");
        assert_eq!(SyncMode::Full.as_pragma(), "FULL");
    }
}
