use rusqlite::Connection;
use std::time::Duration;
use anyhow::{Context, Result};
use log::debug;
use crate::config::Config;
use crate::db::migrations::MigrationManager;

/// How long a command waits for another process holding the write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection manager
pub struct DbConnection;

impl DbConnection {
    /// Connect to the configured database, creating it and parent directories if needed
    pub fn connect(config: &Config) -> Result<Connection> {
        let db_path = &config.data_location;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("Failed to configure database busy timeout")?;
        debug!("opened database {}", db_path.display());

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }

    /// Connect to an in-memory database (for testing)
    pub fn connect_in_memory() -> Result<Connection> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;

        MigrationManager::initialize(&conn)
            .context("Failed to initialize database schema")?;

        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connect_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("ledger.db");
        let config = Config { data_location: db_path.clone(), log_location: None };

        let conn = DbConnection::connect(&config).unwrap();
        assert!(db_path.exists());
        assert_eq!(MigrationManager::get_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_connect_in_memory() {
        let conn = DbConnection::connect_in_memory().unwrap();

        // Verify schema was initialized
        let version = MigrationManager::get_version(&conn).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_reconnect_keeps_schema() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config { data_location: temp_dir.path().join("ledger.db"), log_location: None };
        drop(DbConnection::connect(&config).unwrap());
        let conn = DbConnection::connect(&config).unwrap();
        assert_eq!(MigrationManager::get_version(&conn).unwrap(), 1);
    }
}
