//! Database connection management
//!
//! This module provides the connection wrapper that every store operation goes through.

use std::time::Duration;

use anyhow::{anyhow, Result};
use rusqlite::Connection;
use tracing::debug;

/// Journal modes accepted by `PRAGMA journal_mode`
pub const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Pragmas applied to every freshly opened connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// SQLite journal mode, e.g. `DELETE` or `WAL`
    pub journal_mode: String,
    /// How long a writer waits on a locked file before failing with `SQLITE_BUSY`
    pub busy_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            journal_mode: "DELETE".to_string(),
            busy_timeout: Duration::from_millis(5000),
        }
    }
}

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases with consistent
/// configuration and error handling.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>, settings: &ConnectionSettings) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p)
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p, e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        let db = DatabaseConn { conn };
        db.configure(settings)?;
        debug!("opened store at {}", path.unwrap_or(":memory:"));
        Ok(db)
    }

    /// Open a database at the specified path with default settings
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path), &ConnectionSettings::default())
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None, &ConnectionSettings::default())
    }

    fn configure(&self, settings: &ConnectionSettings) -> Result<()> {
        let journal_mode = settings.journal_mode.to_ascii_uppercase();
        if !JOURNAL_MODES.contains(&journal_mode.as_str()) {
            return Err(anyhow!(
                "Unknown journal mode '{}'. Valid modes: {}",
                settings.journal_mode,
                JOURNAL_MODES.join(", ")
            ));
        }

        self.conn
            .busy_timeout(settings.busy_timeout)
            .map_err(|e| anyhow!("Failed to set busy timeout: {}", e))?;

        // journal_mode reports the resulting mode as a row
        let _: String = self
            .conn
            .query_row(
                &format!("PRAGMA journal_mode={}", journal_mode),
                [],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

        Ok(())
    }

    /// Whether the connection is inside an open transaction
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Close the connection, rolling back anything left uncommitted
    pub fn close(self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.conn
            .close()
            .map_err(|(_, e)| anyhow!("Failed to close database: {}", e))
    }
}
