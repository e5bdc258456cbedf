//! The settings database facade.
//!
//! `SettingsDatabase` offers QSettings-style hierarchical access on top of a
//! SQLite store. Values are fetched lazily: opening only enumerates keys, and
//! a value is read from the store the first time it is asked for. Writes go
//! to memory and to the store in the same call unless the deferred write
//! policy is configured.
//!
//! Store failures never reach the caller. They are logged and the instance
//! keeps working from memory.

use indexmap::IndexSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::cache::SlotCache;
use crate::config::{SettingsConfig, WritePolicy};
use crate::entry::Slot;
use crate::error::SettingsError;
use crate::key::{is_path_or_child, GroupStack};
use crate::stats::{SettingsStats, StatsSnapshot};
use crate::storage::Store;
use crate::value::Value;

/// A grouped key-value settings cache backed by SQLite.
///
/// # Example
/// ```
/// use settings_db::{SettingsDatabase, Value};
///
/// let dir = std::env::temp_dir().join("settings-db-doc");
/// let mut settings = SettingsDatabase::open(&dir, "doc-example");
///
/// settings.begin_group("editor");
/// settings.set("font", "Mono");
/// settings.end_group();
///
/// assert_eq!(settings.get("editor/font"), Some(Value::from("Mono")));
/// assert_eq!(settings.get_or("editor/size", 12), Value::Int(12));
/// ```
#[derive(Debug)]
pub struct SettingsDatabase {
    /// Effective key to cache slot.
    cache: SlotCache,

    groups: GroupStack,

    /// Keys written under the deferred policy and not yet flushed.
    dirty: IndexSet<String>,

    /// `None` when running cache-only.
    store: Option<Store>,

    /// Where the store was (or would have been) opened.
    path: Option<PathBuf>,

    config: SettingsConfig,

    stats: Arc<SettingsStats>,
}

impl SettingsDatabase {
    /// Open the settings stored at `<location>/<namespace>.db`.
    ///
    /// The directory is created if needed. If the store cannot be opened the
    /// instance runs from memory only; see [`is_open`](Self::is_open).
    pub fn open(location: impl AsRef<Path>, namespace: &str) -> Self {
        Self::open_with_config(location, namespace, SettingsConfig::default())
    }

    /// Open with an explicit configuration.
    pub fn open_with_config(
        location: impl AsRef<Path>,
        namespace: &str,
        config: SettingsConfig,
    ) -> Self {
        let path = location
            .as_ref()
            .join(format!("{}.{}", namespace, config.file_extension));

        let store = match Store::open(&path, &config) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(error = %e, "settings will not be persisted");
                None
            }
        };

        let mut settings = Self::from_parts(store, config);
        settings.path = Some(path);
        settings
    }

    /// Wrap a store the caller has already opened.
    pub fn with_store(store: Store, config: SettingsConfig) -> Self {
        let path = store.path().map(Path::to_path_buf);
        let mut settings = Self::from_parts(Some(store), config);
        settings.path = path;
        settings
    }

    /// A settings instance without any store.
    pub fn in_memory() -> Self {
        Self::from_parts(None, SettingsConfig::default())
    }

    fn from_parts(store: Option<Store>, config: SettingsConfig) -> Self {
        let mut cache = SlotCache::new();
        let stats = Arc::new(SettingsStats::new());

        // Only keys are loaded up front; values are fetched on first access.
        if let Some(store) = &store {
            match store.keys() {
                Ok(listing) => {
                    for _ in 0..listing.skipped {
                        stats.record_store_error();
                    }
                    cache.seed(listing.keys);
                }
                Err(e) => {
                    stats.record_store_error();
                    warn!(error = %e, "failed to enumerate stored settings");
                }
            }
        }
        stats.set_size(cache.len() as u64);

        Self {
            cache,
            groups: GroupStack::new(),
            dirty: IndexSet::new(),
            store,
            path: None,
            config,
            stats,
        }
    }

    /// Store `value` under `key` in the current group.
    ///
    /// The value is always kept in memory. Whether it also reached the store
    /// is not reported.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let key = self.groups.effective_key(key);
        let value = value.into();

        if let Some(store) = &self.store {
            match self.config.write_policy {
                WritePolicy::Immediate => match store.upsert(&key, &value) {
                    Ok(()) => {
                        self.stats.record_store_writes(1);
                        debug!(key = %key, value = %value, "stored setting");
                    }
                    Err(e) => self.report(e),
                },
                WritePolicy::Deferred => {
                    self.dirty.insert(key.clone());
                }
            }
        }

        self.cache.insert(key, Slot::Materialized(value));
        self.stats.set_size(self.cache.len() as u64);
    }

    /// Read the value stored under `key` in the current group.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let key = self.groups.effective_key(key);
        self.lookup(&key)
    }

    /// Read a value, falling back to `default` when there is none.
    pub fn get_or(&mut self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    fn lookup(&mut self, key: &str) -> Option<Value> {
        match self.cache.get(key) {
            Some(Slot::Materialized(value)) => {
                self.stats.record_cache_hit();
                trace!(key, "setting served from cache");
                return Some(value.clone());
            }
            Some(Slot::KnownAbsent) => {
                self.stats.record_miss();
                return None;
            }
            Some(Slot::Unloaded) | None => {}
        }

        let store = match &self.store {
            Some(store) => store,
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        self.stats.record_store_read();
        match store.get(key) {
            Ok(Some(value)) => {
                self.stats.record_store_hit();
                debug!(key, value = %value, "retrieved setting");
                self.cache
                    .insert(key.to_string(), Slot::Materialized(value.clone()));
                self.stats.set_size(self.cache.len() as u64);
                Some(value)
            }
            Ok(None) => {
                self.stats.record_miss();
                if self.config.cache_misses {
                    self.cache.insert(key.to_string(), Slot::KnownAbsent);
                    self.stats.set_size(self.cache.len() as u64);
                }
                None
            }
            Err(e) => {
                self.report(e);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Whether `key` has a value or is a group with settings below it.
    ///
    /// Loads the value into memory as a side effect.
    pub fn contains(&mut self, key: &str) -> bool {
        let key = self.groups.effective_key(key);
        if self.lookup(&key).is_some() || self.cache.has_listed_children(&key) {
            return true;
        }

        match &self.store {
            Some(store) => match store.has_children(&key) {
                Ok(found) => found,
                Err(e) => {
                    self.report(e);
                    false
                }
            },
            None => false,
        }
    }

    /// Remove `key` and every setting below it.
    pub fn remove(&mut self, key: &str) {
        let key = self.groups.effective_key(key);

        let dropped = self.cache.remove_tree(&key);
        self.dirty.retain(|k| !is_path_or_child(k, &key));
        self.stats.record_removal();
        self.stats.set_size(self.cache.len() as u64);

        if let Some(store) = &self.store {
            match store.remove_tree(&key) {
                Ok(rows) => debug!(key = %key, rows, cached = dropped, "removed settings"),
                Err(e) => self.report(e),
            }
        }
    }

    /// Enter a group. Later keys are resolved relative to it.
    pub fn begin_group(&mut self, prefix: &str) {
        self.groups.push(prefix);
    }

    /// Leave the innermost group.
    pub fn end_group(&mut self) {
        if self.groups.pop().is_none() {
            warn!("end_group called without a matching begin_group");
        }
    }

    /// The current group, '/'-joined.
    pub fn group(&self) -> String {
        self.groups.group()
    }

    /// Keys directly inside the current group.
    ///
    /// Only the cache is consulted; it holds every stored key from the
    /// moment the store was opened.
    pub fn child_keys(&self) -> Vec<String> {
        self.cache.child_keys(&self.groups.group())
    }

    /// Groups directly inside the current group.
    pub fn child_groups(&self) -> Vec<String> {
        self.cache.child_groups(&self.groups.group())
    }

    /// Every key below the current group, relative to it.
    pub fn all_keys(&self) -> Vec<String> {
        self.cache.all_keys(&self.groups.group())
    }

    /// Start a store transaction so that a run of `set` calls is committed
    /// together.
    pub fn begin_transaction(&mut self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.begin() {
                self.report(e);
            }
        }
    }

    /// Commit the transaction started by `begin_transaction`.
    ///
    /// Pending deferred writes are flushed into it first.
    pub fn end_transaction(&mut self) {
        if self.store.is_none() {
            return;
        }
        self.sync();
        if let Some(store) = &self.store {
            if let Err(e) = store.commit() {
                self.report(e);
            }
        }
    }

    /// Write out pending deferred writes.
    ///
    /// Does nothing under the immediate write policy, where every write has
    /// already reached the store. On failure the keys stay pending.
    pub fn sync(&mut self) {
        if self.dirty.is_empty() {
            return;
        }
        let store = match &self.store {
            Some(store) => store,
            None => {
                self.dirty.clear();
                return;
            }
        };

        let entries: Vec<(&str, &Value)> = self
            .dirty
            .iter()
            .filter_map(|k| {
                self.cache
                    .get(k)
                    .and_then(Slot::value)
                    .map(|v| (k.as_str(), v))
            })
            .collect();

        match store.upsert_many(entries) {
            Ok(rows) => {
                self.stats.record_store_writes(rows as u64);
                debug!(rows, "flushed deferred settings");
                self.dirty.clear();
            }
            Err(e) => self.report(e),
        }
    }

    /// Whether a store is attached.
    pub fn is_open(&self) -> bool {
        self.store.is_some()
    }

    /// Path of the store file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of deferred writes waiting for `sync`.
    pub fn pending_writes(&self) -> usize {
        self.dirty.len()
    }

    /// Number of cache slots, loaded or not.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache holds no slots at all.
    pub fn is_empty(&self) -> bool {
        self.cache.len() == 0
    }

    /// A snapshot of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Shared handle to the live counters, for external metrics.
    pub fn stats_ref(&self) -> Arc<SettingsStats> {
        Arc::clone(&self.stats)
    }

    fn report(&self, err: SettingsError) {
        self.stats.record_store_error();
        warn!(error = %err, "settings store operation failed; using cached values");
    }
}

impl Drop for SettingsDatabase {
    fn drop(&mut self) {
        self.sync();

        if let Some(store) = &self.store {
            if store.in_transaction() {
                warn!("committing settings transaction left open");
                if let Err(e) = store.commit() {
                    warn!(error = %e, "failed to commit settings on close");
                }
            }
        }
    }
}
