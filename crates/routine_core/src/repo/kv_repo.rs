//! Key-value capability for simple device-style storage.
//!
//! # Responsibility
//! - Provide get/put/delete/list over opaque string values.
//! - Back journal and mood collections without giving them their own tables.
//!
//! # Invariants
//! - Keys are non-empty.
//! - `put` is an upsert; the last write for a key wins.
//! - `update` holds the write lock from read to write, so concurrent
//!   read-modify-write cycles on one key never drop each other's changes.

use crate::db::migrations::ensure_schema_ready;
use crate::repo::routine_repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Key-value storage injected into services that only need simple reads/writes.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn put(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Returns whether a value was removed.
    fn delete(&self, key: &str) -> RepoResult<bool>;
    /// Lists keys starting with `prefix`, sorted ascending.
    fn list_keys(&self, prefix: &str) -> RepoResult<Vec<String>>;
    /// Reads `key`, lets `apply` compute the replacement value and stores it
    /// atomically. Nothing is written when `apply` fails.
    fn update<T, E>(
        &self,
        key: &str,
        apply: impl FnOnce(Option<String>) -> Result<(String, T), E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>;
}

/// SQLite-backed key-value store over `kv_entries`.
pub struct SqliteKeyValueStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKeyValueStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> RepoResult<()> {
        ensure_key(key)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }

    fn list_keys(&self, prefix: &str) -> RepoResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT key
             FROM kv_entries
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([prefix])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get::<_, String>(0)?);
        }
        Ok(keys)
    }

    fn update<T, E>(
        &self,
        key: &str,
        apply: impl FnOnce(Option<String>) -> Result<(String, T), E>,
    ) -> Result<T, E>
    where
        E: From<RepoError>,
    {
        ensure_key(key)?;
        self.conn
            .execute_batch("BEGIN IMMEDIATE;")
            .map_err(RepoError::from)?;

        let result = self
            .get(key)
            .map_err(E::from)
            .and_then(apply)
            .and_then(|(value, output)| {
                self.put(key, &value)?;
                Ok(output)
            });
        let finished = match result {
            Ok(output) => self
                .conn
                .execute_batch("COMMIT;")
                .map(|()| output)
                .map_err(|err| E::from(RepoError::from(err))),
            Err(err) => Err(err),
        };
        if finished.is_err() {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
        finished
    }
}

fn ensure_key(key: &str) -> RepoResult<()> {
    if key.is_empty() {
        return Err(RepoError::InvalidData(
            "key-value store keys must not be empty".to_string(),
        ));
    }
    Ok(())
}
