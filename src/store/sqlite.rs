use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection};
use rusqlite_migration::{Migrations, M};

use crate::app::{FedimageError, Result};
use crate::domain::CreatorKey;
use crate::store::DedupStore;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            FedimageError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn insert_namespace(conn: &Connection, creator: &CreatorKey) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO creators (key, first_seen_at) VALUES (?1, ?2)",
            params![creator.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl DedupStore for SqliteStore {
    fn ensure_namespace(&self, creator: &CreatorKey) -> Result<()> {
        let conn = self.lock()?;
        Self::insert_namespace(&conn, creator)
    }

    fn exists(&self, creator: &CreatorKey, media_url: &str) -> Result<bool> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM downloads WHERE creator = ?1 AND media_url = ?2",
            params![creator.as_str(), media_url],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn record(&self, creator: &CreatorKey, media_url: &str) -> Result<bool> {
        let mut conn = self.lock()?;

        let tx = conn.transaction()?;
        Self::insert_namespace(&tx, creator)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO downloads (creator, media_url, downloaded_at) VALUES (?1, ?2, ?3)",
            params![creator.as_str(), media_url, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        Ok(inserted > 0)
    }
}
