use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::error::Result;

/// Fixed id of the single counter document.
pub const VISITOR_DOC_ID: &str = "visitor-count";

pub trait VisitorCounter {
    /// Atomically bump the persisted count and return the new value.
    /// Returns 0 when the count is unavailable.
    fn increment_and_get(&mut self) -> u64;
}

/// Counter documents stored in a SQLite table.
#[derive(Debug)]
pub struct SqliteVisitorCounter {
    conn: Connection,
    doc_id: String,
}

impl SqliteVisitorCounter {
    /// Open (or create) the counter database at the default state location.
    pub fn new() -> Result<Self> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("roundcount_visitors.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS counters (
                id TEXT PRIMARY KEY,
                count INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self {
            conn,
            doc_id: VISITOR_DOC_ID.to_string(),
        })
    }

    /// Increment inside an immediate transaction so concurrent sessions
    /// against the same file serialize on the write lock.
    pub fn try_increment(&mut self) -> Result<u64> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT count FROM counters WHERE id = ?1",
                [&self.doc_id],
                |row| row.get(0),
            )
            .optional()?;

        let next = match current {
            None => 1,
            Some(count) => count.max(0) + 1,
        };

        tx.execute(
            r#"
            INSERT INTO counters (id, count, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET count = excluded.count, updated_at = excluded.updated_at
            "#,
            params![self.doc_id, next, Local::now().to_rfc3339()],
        )?;
        tx.commit()?;

        debug!(count = next, "visitor count incremented");
        Ok(next as u64)
    }

    /// Current count without incrementing; 0 if the document is absent.
    pub fn current(&self) -> Result<u64> {
        let count: Option<i64> = self
            .conn
            .query_row(
                "SELECT count FROM counters WHERE id = ?1",
                [&self.doc_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }
}

impl VisitorCounter for SqliteVisitorCounter {
    fn increment_and_get(&mut self) -> u64 {
        match self.try_increment() {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "visitor counter transaction failed");
                0
            }
        }
    }
}

/// Count this session once on a background thread. The receiver yields the
/// new count, or 0 if the store could not be opened or updated.
pub fn count_visit_in_background<F>(open: F) -> Receiver<u64>
where
    F: FnOnce() -> Result<SqliteVisitorCounter> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let count = match open() {
            Ok(mut counter) => counter.increment_and_get(),
            Err(e) => {
                warn!(error = %e, "visitor counter unavailable");
                0
            }
        };
        let _ = tx.send(count);
    });
    rx
}
