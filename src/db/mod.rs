pub mod models;
pub mod queries;

pub use queries::file_mtime;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// Bumped whenever the table layout changes. A store carrying any other
/// version is dropped and recreated; nothing in it is not re-derivable.
pub const SCHEMA_VERSION: &str = "mediameta-3";

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Rebuild failed: {0}")]
    Rebuild(String),
    #[error("Extras encoding failed: {0}")]
    Extras(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// The metadata cache. Each public operation holds the connection lock for
/// its whole duration, so callers on different threads never interleave
/// inside one transaction.
pub struct Database {
    conn: Mutex<Connection>,
}

const TABLES: &[&str] = &["subtracks", "audiotracks", "files", "metadata"];

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn();
        // WAL mode for better concurrent read performance
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        match stored_version(&conn) {
            Some(v) if v == SCHEMA_VERSION => {
                log::debug!("cache schema {v} is current");
                Ok(())
            }
            found => {
                log::info!(
                    "cache schema {} does not match {SCHEMA_VERSION}, rebuilding",
                    found.as_deref().unwrap_or("(none)")
                );
                rebuild(&conn)
            }
        }
    }
}

/// The stored version, or `None` when the table is missing, empty, holds
/// more than one row, or cannot be read at all.
fn stored_version(conn: &Connection) -> Option<String> {
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))
        .ok()?;
    if rows != 1 {
        return None;
    }
    conn.query_row(
        "SELECT value FROM metadata WHERE key = 'version'",
        [],
        |row| row.get(0),
    )
    .optional()
    .ok()
    .flatten()
}

fn rebuild(conn: &Connection) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for table in TABLES {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
    }
    tx.execute_batch(
        "
        CREATE TABLE metadata (
            key     TEXT PRIMARY KEY,
            value   TEXT NOT NULL
        );

        CREATE TABLE files (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            filename                TEXT NOT NULL,
            modified                INTEGER NOT NULL,
            type                    INTEGER NOT NULL,
            container               TEXT,
            duration                REAL,
            bitrate                 INTEGER,
            bitrate_mode            TEXT,
            size                    INTEGER,
            width                   INTEGER,
            height                  INTEGER,
            aspect_ratio_container  TEXT,
            aspect_ratio_video      TEXT,
            aspect_ratio_dvd_iso    TEXT,
            codecv                  TEXT,
            profile                 TEXT,
            level                   TEXT,
            stereoscopy             TEXT,
            scan_type               TEXT,
            scan_order              TEXT,
            frame_rate              TEXT,
            frame_rate_mode         TEXT,
            ref_frames              INTEGER,
            video_bit_depth         INTEGER,
            video_track_count       INTEGER NOT NULL DEFAULT 0,
            image_count             INTEGER NOT NULL DEFAULT 0,
            thumb                   BLOB,
            thumb_mime              TEXT,
            thumb_width             INTEGER,
            thumb_height            INTEGER,
            extras                  TEXT,
            UNIQUE(filename, modified)
        );
        CREATE INDEX idx_files_filename ON files(filename);

        CREATE TABLE audiotracks (
            fileid          INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            id              INTEGER NOT NULL,
            stream_id       INTEGER NOT NULL,
            lang            TEXT,
            title           TEXT,
            codec           TEXT,
            channels        INTEGER,
            sample_rate     INTEGER,
            bit_depth       INTEGER,
            bitrate         INTEGER,
            bitrate_mode    TEXT,
            delay           INTEGER,
            album           TEXT,
            artist          TEXT,
            song_name       TEXT,
            track_number    INTEGER,
            year            INTEGER,
            genre           TEXT,
            PRIMARY KEY (fileid, id)
        );

        CREATE TABLE subtracks (
            fileid          INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
            id              INTEGER NOT NULL,
            stream_id       INTEGER NOT NULL,
            lang            TEXT,
            title           TEXT,
            format          TEXT,
            forced          INTEGER NOT NULL DEFAULT 0,
            is_default      INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (fileid, id)
        );
        ",
    )?;
    tx.execute(
        "INSERT INTO metadata (key, value) VALUES ('version', ?1)",
        params![SCHEMA_VERSION],
    )?;
    tx.commit()
        .map_err(|e| DbError::Rebuild(format!("commit: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_records_version() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(stored_version(&db.conn()).as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn reopen_keeps_current_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO files (filename, modified, type) VALUES ('/a.mkv', 1, 4)",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn version_mismatch_rebuilds_from_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let db = Database::open(&path).unwrap();
            let conn = db.conn();
            conn.execute(
                "INSERT INTO files (filename, modified, type) VALUES ('/a.mkv', 1, 4)",
                [],
            )
            .unwrap();
            conn.execute("UPDATE metadata SET value = 'ancient' WHERE key = 'version'", [])
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(stored_version(&db.conn()).as_deref(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn foreign_store_without_metadata_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE files (whatever TEXT); INSERT INTO files VALUES ('x');")
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
