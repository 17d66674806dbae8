use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use crate::models::TaskRegistry;
use crate::repo::KvRepo;
use anyhow::{Context, Result};
use log::{debug, info};

const NAMESPACE: &str = "registry";
const SNAPSHOT_KEY: &str = "snapshot";
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    registry: &'a TaskRegistry,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    registry: TaskRegistry,
}

/// Registry repository
///
/// The whole registry is stored as one JSON snapshot and is always loaded
/// and saved wholesale.
///
/// # Example
///
/// ```no_run
/// use timetrack::db::DbConnection;
/// use timetrack::models::{EntryStatus, Title};
/// use timetrack::repo::RegistryRepo;
///
/// let conn = DbConnection::connect_in_memory().unwrap();
/// let title = Title::new("write report").unwrap();
/// RegistryRepo::update(&conn, |registry| {
///     Ok(registry.insert_entry(&title, EntryStatus::Active)?)
/// }).unwrap();
/// ```
pub struct RegistryRepo;

impl RegistryRepo {
    /// Load the registry, or an empty one if nothing has been saved yet.
    ///
    /// A snapshot that violates the registry invariants is rejected.
    pub fn load_registry(conn: &Connection) -> Result<TaskRegistry> {
        let Some(blob) = KvRepo::get(conn, NAMESPACE, SNAPSHOT_KEY)? else {
            info!("no saved registry, starting empty");
            return Ok(TaskRegistry::new());
        };

        let snapshot: Snapshot = serde_json::from_slice(&blob)
            .context("Failed to decode registry snapshot")?;
        if snapshot.version != SNAPSHOT_VERSION {
            anyhow::bail!(
                "Failed to load registry: unsupported snapshot version {}",
                snapshot.version
            );
        }

        snapshot.registry.check_consistency()
            .context("Saved registry is corrupt")?;
        debug!("loaded registry with {} tasks", snapshot.registry.len());
        Ok(snapshot.registry)
    }

    /// Persist the whole registry in a single write
    pub fn save_registry(conn: &Connection, registry: &TaskRegistry) -> Result<()> {
        let blob = serde_json::to_vec(&SnapshotRef {
            version: SNAPSHOT_VERSION,
            registry,
        })
        .context("Failed to encode registry snapshot")?;
        KvRepo::set(conn, NAMESPACE, SNAPSHOT_KEY, &blob)?;
        debug!("saved registry with {} tasks", registry.len());
        Ok(())
    }

    /// Load, mutate and save the registry inside one write transaction.
    ///
    /// If `f` fails nothing is written.
    pub fn update<T, F>(conn: &Connection, f: F) -> Result<T>
    where
        F: FnOnce(&mut TaskRegistry) -> Result<T>,
    {
        let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
            .context("Failed to begin registry transaction")?;
        let mut registry = Self::load_registry(&tx)?;
        let value = f(&mut registry)?;
        Self::save_registry(&tx, &registry)?;
        tx.commit().context("Failed to commit registry transaction")?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::error::TrackerError;
    use crate::models::{EntryStatus, Tag, Title};

    fn title(s: &str) -> Title {
        Title::new(s).unwrap()
    }

    #[test]
    fn test_load_empty() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let registry = RegistryRepo::load_registry(&conn).unwrap();
        assert!(registry.is_empty());
        assert!(registry.current_active().is_none());
        assert!(registry.last_active().is_none());
        assert!(registry.tag_index().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let mut registry = TaskRegistry::new();
        registry.insert_entry(&title("a"), EntryStatus::Active).unwrap();
        registry.add_tag(&Tag::parse("#work").unwrap(), &title("a")).unwrap();
        RegistryRepo::save_registry(&conn, &registry).unwrap();

        let loaded = RegistryRepo::load_registry(&conn).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_update_persists() {
        let conn = DbConnection::connect_in_memory().unwrap();
        RegistryRepo::update(&conn, |registry| {
            Ok(registry.insert_entry(&title("a"), EntryStatus::Active)?)
        })
        .unwrap();
        let loaded = RegistryRepo::load_registry(&conn).unwrap();
        assert_eq!(loaded.current_active(), Some(&title("a")));
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let result: Result<()> = RegistryRepo::update(&conn, |registry| {
            registry.insert_entry(&title("a"), EntryStatus::Active)?;
            registry.add_tag(&Tag::parse("#work").unwrap(), &title("ghost"))?;
            Ok(())
        });
        let err = result.unwrap_err();
        assert_eq!(
            err.downcast_ref::<TrackerError>(),
            Some(&TrackerError::NotFound(title("ghost")))
        );
        assert!(RegistryRepo::load_registry(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_fatal() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let blob = br#"{"version":1,"registry":{"current_active":"ghost","last_active":null,"tasks":{},"tags":{}}}"#;
        KvRepo::set(&conn, NAMESPACE, SNAPSHOT_KEY, blob).unwrap();

        let err = RegistryRepo::load_registry(&conn).unwrap_err();
        let tracker = err.downcast_ref::<TrackerError>().unwrap();
        assert!(tracker.is_fatal());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let blob = br#"{"version":99,"registry":{}}"#;
        KvRepo::set(&conn, NAMESPACE, SNAPSHOT_KEY, blob).unwrap();
        let err = RegistryRepo::load_registry(&conn).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version 99"));
    }
}
