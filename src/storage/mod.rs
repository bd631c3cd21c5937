//! SQLite-backed storage. Business records live in relational tables; page
//! sections live in the `documents` collection table (see [`documents`]).

use crate::error::{CmsError, Result};
use rusqlite::{Connection, ToSql, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

pub mod blog;
pub mod contact;
pub mod documents;
pub mod navigation;
pub mod services;
pub mod settings;
pub mod testimonials;
pub mod users;

pub use documents::SectionDocument;

const INITIAL_SCHEMA: &str = include_str!("../../migrations/001_initial_schema.sql");

/// Cloneable handle over one SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Creates missing tables. Safe to run repeatedly.
    pub fn migrate(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute_batch(INITIAL_SCHEMA)?;
            Ok(())
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CmsError::Poisoned)
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Accumulates `WHERE` clauses and their positional parameters.
#[derive(Default)]
pub(crate) struct SqlFilter {
    clauses: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl SqlFilter {
    pub fn push(&mut self, clause: &str, value: impl ToSql + 'static) {
        self.clauses.push(clause.to_string());
        self.params.push(Box::new(value));
    }

    /// A clause that reuses one value several times (`?` placeholders only).
    pub fn push_repeated(&mut self, clause: &str, value: String) {
        let count = clause.matches('?').count();
        self.clauses.push(clause.to_string());
        for _ in 0..count {
            self.params.push(Box::new(value.clone()));
        }
    }

    pub fn push_raw(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }

    pub fn params_with<'a>(&'a self, extra: &[&'a dyn ToSql]) -> Vec<&'a dyn ToSql> {
        let mut out = self.params();
        out.extend_from_slice(extra);
        out
    }
}

/// `%term%` with LIKE wildcards escaped; pair with `ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Maps a UNIQUE violation on insert/update to a conflict with a readable message.
pub(crate) fn conflict_on_unique<T>(result: Result<T>, message: impl FnOnce() -> String) -> Result<T> {
    match result {
        Err(e) if e.is_unique_violation() => Err(CmsError::Conflict(message())),
        Err(e) if e.is_foreign_key_violation() => Err(CmsError::validation(
            "referenced record does not exist",
        )),
        other => other,
    }
}

/// Errors with `NotFound` when a write touched no rows.
pub(crate) fn expect_changed(changed: usize, what: &str) -> Result<()> {
    if changed == 0 {
        return Err(CmsError::not_found(what));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let statuses: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM post_statuses", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(statuses, 3);
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cms.db");
        Database::open(&path).unwrap();
        assert!(path.exists());
    }
}
