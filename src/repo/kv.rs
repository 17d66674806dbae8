use rusqlite::{Connection, OptionalExtension};
use anyhow::{Context, Result};

/// Namespaced key/value repository
///
/// Keys are unique within a namespace. Values are opaque blobs.
///
/// # Example
///
/// ```no_run
/// use timetrack::db::DbConnection;
/// use timetrack::repo::KvRepo;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// KvRepo::set(&conn, "settings", "theme", b"dark").unwrap();
/// assert_eq!(KvRepo::get(&conn, "settings", "theme").unwrap(), Some(b"dark".to_vec()));
/// ```
pub struct KvRepo;

impl KvRepo {
    /// Get a value, or None if the key does not exist
    pub fn get(conn: &Connection, namespace: &str, key: &str) -> Result<Option<Vec<u8>>> {
        conn.query_row(
            "SELECT value FROM kv WHERE namespace = ?1 AND key = ?2",
            [namespace, key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("Failed to read key {}/{}", namespace, key))
    }

    /// Insert or replace a value
    pub fn set(conn: &Connection, namespace: &str, key: &str, value: &[u8]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO kv (namespace, key, value, modified_ts) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET
               value = excluded.value,
               modified_ts = excluded.modified_ts",
            rusqlite::params![namespace, key, value, now],
        )
        .with_context(|| format!("Failed to write key {}/{}", namespace, key))?;
        Ok(())
    }
}
