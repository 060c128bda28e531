//! SQLite storage layer for Gather

mod chats;
mod groups;
mod migrations;
mod parse;
mod users;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;

pub use chats::ChatStore;
pub use groups::GroupStore;
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get group store
    pub fn groups(&self) -> GroupStore<'_> {
        GroupStore::new(&self.conn)
    }

    /// Get chat log store
    pub fn chats(&self) -> ChatStore<'_> {
        ChatStore::new(&self.conn)
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gather.db");

        let db = Database::open(&path).unwrap();
        assert!(db.schema_version() > 0);
        assert!(path.exists());

        // Reopening runs no further migrations and keeps the version
        let version = db.schema_version();
        drop(db);
        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version(), version);
    }
}
