//! SQLite-backed persistent store.
//!
//! A `Store` exclusively owns its connection; dropping the handle closes the
//! file. All rows live in a single `settings(key, value)` table where
//! inserting an existing key replaces the old row.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::SettingsConfig;
use crate::error::{SettingsError, SettingsResult};
use crate::value::Value;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS settings (key PRIMARY KEY ON CONFLICT REPLACE, value)";

/// Keys enumerated from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyListing {
    /// Every usable key, in key order. Numeric keys are rendered as text.
    pub keys: Vec<String>,

    /// Rows whose key is NULL or a blob and cannot be addressed by name.
    pub skipped: usize,
}

/// Handle to an open settings store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,

    /// File backing the store; `None` for in-memory stores.
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the store file at `path`, creating its directory
    /// if needed.
    pub fn open(path: impl AsRef<Path>, config: &SettingsConfig) -> SettingsResult<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path).map_err(|source| SettingsError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::init(conn, Some(path.to_path_buf()), config)
    }

    /// Open a private store that lives only as long as the handle.
    pub fn open_in_memory(config: &SettingsConfig) -> SettingsResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| SettingsError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Self::init(conn, None, config)
    }

    fn init(conn: Connection, path: Option<PathBuf>, config: &SettingsConfig) -> SettingsResult<Self> {
        conn.execute(SCHEMA, []).map_err(SettingsError::Schema)?;

        // Syncing is slow on most platforms; losing the last writes on a crash is acceptable.
        let mode = config.synchronous.as_pragma();
        if let Err(e) = conn.pragma_update(None, "synchronous", mode) {
            warn!(error = %e, mode, "failed to set settings store durability");
        }

        debug!(path = ?path, mode, "opened settings store");
        Ok(Self { conn, path })
    }

    /// File backing the store, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every stored key, in key order.
    ///
    /// The key column is untyped, so rows written by other tools may hold
    /// numbers there; those are rendered as text. NULL and blob keys are
    /// skipped and counted.
    pub fn keys(&self) -> SettingsResult<KeyListing> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM settings ORDER BY key")
            .map_err(SettingsError::query("list keys"))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, SqlValue>(0))
            .map_err(SettingsError::query("list keys"))?;

        let mut listing = KeyListing::default();
        for key in rows {
            match key.map_err(SettingsError::query("list keys"))? {
                SqlValue::Text(key) => listing.keys.push(key),
                SqlValue::Integer(i) => listing.keys.push(i.to_string()),
                SqlValue::Real(f) => listing.keys.push(f.to_string()),
                other => {
                    warn!(key_type = ?other.data_type(), "skipping stored setting without a usable key");
                    listing.skipped += 1;
                }
            }
        }
        Ok(listing)
    }

    /// Look up a single key. A NULL value counts as absent.
    pub fn get(&self, key: &str) -> SettingsResult<Option<Value>> {
        let value = self
            .conn
            .prepare_cached("SELECT value FROM settings WHERE key = ?1")
            .and_then(|mut stmt| {
                stmt.query_row([key], |row| row.get::<_, Option<Value>>(0))
                    .optional()
            })
            .map_err(SettingsError::query("read"))?;
        Ok(value.flatten())
    }

    /// Insert or replace a single row.
    pub fn upsert(&self, key: &str, value: &Value) -> SettingsResult<()> {
        self.conn
            .prepare_cached("INSERT INTO settings VALUES (?1, ?2)")
            .and_then(|mut stmt| stmt.execute(params![key, value]))
            .map_err(SettingsError::query("write"))?;
        Ok(())
    }

    /// Insert or replace several rows.
    ///
    /// Runs inside its own transaction unless one is already open, in which
    /// case the rows join it. Returns the number of rows written.
    pub fn upsert_many<'a, I>(&self, entries: I) -> SettingsResult<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let owns_transaction = !self.in_transaction();
        if owns_transaction {
            self.begin()?;
        }

        let mut written = 0;
        for (key, value) in entries {
            if let Err(e) = self.upsert(key, value) {
                if owns_transaction {
                    if let Err(rollback) = self.rollback() {
                        warn!(error = %rollback, "failed to roll back settings batch");
                    }
                }
                return Err(e);
            }
            written += 1;
        }

        if owns_transaction {
            self.commit()?;
        }
        Ok(written)
    }

    /// Delete `key` and every key below it in one statement.
    ///
    /// Children are matched by exact prefix, so keys containing `%` or `_`
    /// are not treated as patterns.
    pub fn remove_tree(&self, key: &str) -> SettingsResult<usize> {
        let prefix = format!("{}/", key);
        let removed = self
            .conn
            .execute(
                "DELETE FROM settings WHERE key = ?1 OR substr(key, 1, ?2) = ?3",
                params![key, prefix.chars().count() as i64, prefix],
            )
            .map_err(SettingsError::query("remove"))?;
        Ok(removed)
    }

    /// Whether any stored key lies strictly below `key`.
    pub fn has_children(&self, key: &str) -> SettingsResult<bool> {
        let prefix = format!("{}/", key);
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM settings WHERE substr(key, 1, ?1) = ?2 AND length(key) > ?1 LIMIT 1",
                params![prefix.chars().count() as i64, prefix],
                |_| Ok(()),
            )
            .optional()
            .map_err(SettingsError::query("group lookup"))?;
        Ok(found.is_some())
    }

    pub fn begin(&self) -> SettingsResult<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(SettingsError::query("begin transaction"))
    }

    pub fn commit(&self) -> SettingsResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(SettingsError::query("commit transaction"))
    }

    pub(crate) fn rollback(&self) -> SettingsResult<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(SettingsError::query("roll back transaction"))
    }

    /// Whether a transaction is currently open on this connection.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::open_in_memory(&SettingsConfig::default()).unwrap()
    }

    #[test]
    fn test_upsert_and_get() {
        let store = store();
        store.upsert("theme", &Value::from("dark")).unwrap();
        assert_eq!(store.get("theme").unwrap(), Some(Value::from("dark")));
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_upsert_replaces_existing_row() {
        let store = store();
        store.upsert("k", &Value::Int(1)).unwrap();
        store.upsert("k", &Value::Int(2)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::Int(2)));
        assert_eq!(store.keys().unwrap().keys, vec!["k".to_string()]);
    }

    #[test]
    fn test_keys_are_sorted() {
        let store = store();
        store.upsert("b", &Value::Int(1)).unwrap();
        store.upsert("a/x", &Value::Int(2)).unwrap();
        assert_eq!(store.keys().unwrap().keys, vec!["a/x".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_remove_tree() {
        let store = store();
        for key in ["a", "a/b", "a/b/c", "ab", "b/a"] {
            store.upsert(key, &Value::Bool(true)).unwrap();
        }

        assert_eq!(store.remove_tree("a").unwrap(), 3);
        assert_eq!(store.keys().unwrap().keys, vec!["ab".to_string(), "b/a".to_string()]);
    }

    #[test]
    fn test_remove_tree_treats_wildcards_literally() {
        let store = store();
        store.upsert("a_b/x", &Value::Int(1)).unwrap();
        store.upsert("axb/x", &Value::Int(2)).unwrap();
        store.upsert("50%", &Value::Int(3)).unwrap();
        store.upsert("500", &Value::Int(4)).unwrap();

        assert_eq!(store.remove_tree("a_b").unwrap(), 1);
        assert_eq!(store.remove_tree("50%").unwrap(), 1);
        assert_eq!(store.keys().unwrap().keys, vec!["500".to_string(), "axb/x".to_string()]);
    }

    #[test]
    fn test_has_children() {
        let store = store();
        store.upsert("grp/x", &Value::Int(1)).unwrap();
        store.upsert("leaf", &Value::Int(1)).unwrap();

        assert!(store.has_children("grp").unwrap());
        assert!(!store.has_children("gr").unwrap());
        assert!(!store.has_children("leaf").unwrap());
        assert!(!store.has_children("grp/x").unwrap());
    }

    #[test]
    fn test_upsert_many_in_one_transaction() {
        let store = store();
        let a = Value::Int(1);
        let b = Value::from("two");
        let written = store.upsert_many([("a", &a), ("b", &b)]).unwrap();

        assert_eq!(written, 2);
        assert!(!store.in_transaction());
        assert_eq!(store.get("b").unwrap(), Some(b));
    }

    #[test]
    fn test_upsert_many_joins_open_transaction() {
        let store = store();
        store.begin().unwrap();
        let v = Value::Int(1);
        store.upsert_many([("a", &v)]).unwrap();
        assert!(store.in_transaction());
        store.rollback().unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_transactions() {
        let store = store();
        assert!(!store.in_transaction());
        store.begin().unwrap();
        assert!(store.in_transaction());
        store.upsert("k", &Value::Int(1)).unwrap();
        store.commit().unwrap();
        assert!(!store.in_transaction());
        assert_eq!(store.get("k").unwrap(), Some(Value::Int(1)));

        assert!(store.commit().is_err());
    }

    #[test]
    fn test_keys_with_foreign_key_types() {
        let store = store();
        store
            .conn
            .execute_batch(
                "INSERT INTO settings VALUES ('g/a', 1);
                 INSERT INTO settings VALUES (7, 'x');
                 INSERT INTO settings VALUES (NULL, 'y');
                 INSERT INTO settings VALUES (x'00ff', 'z');",
            )
            .unwrap();

        let listing = store.keys().unwrap();
        assert_eq!(listing.keys, vec!["7".to_string(), "g/a".to_string()]);
        assert_eq!(listing.skipped, 2);
    }

    #[test]
    fn test_upsert_many_rolls_back_on_failure() {
        let store = store();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON settings WHEN NEW.key = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let a = Value::Int(1);
        let bad = Value::Int(2);
        let result = store.upsert_many([("a", &a), ("bad", &bad)]);

        assert!(matches!(result, Err(SettingsError::Query { .. })));
        assert!(!store.in_transaction());
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/settings.db");
        let store = Store::open(&path, &SettingsConfig::default()).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert!(path.exists());
    }

    #[test]
    fn test_open_below_a_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        let result = Store::open(blocker.join("settings.db"), &SettingsConfig::default());
        assert!(matches!(result, Err(SettingsError::IoError(_))));
    }

    #[test]
    fn test_open_file_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.db");
        {
            let store = Store::open(&path, &SettingsConfig::default()).unwrap();
            store.upsert("k", &Value::from("v")).unwrap();
            assert_eq!(store.path(), Some(path.as_path()));
        }
        let store = Store::open(&path, &SettingsConfig::default()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(Value::from("v")));
    }
}
