//! SQLite-based focus session storage.
//!
//! Provides persistent storage for:
//! - Focus sessions and their task links
//! - Session statistics (daily and all-time)
//! - Key-value store for application state and preferences

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{DatabaseError, Result};
use crate::session::{NewSession, SessionId, SessionUpdate, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: String,
    pub duration: u32,
    pub actual_duration: u32,
    pub completed: bool,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub total_sessions: u64,
    pub completed_sessions: u64,
    pub total_focus_min: u64,
    pub today_sessions: u64,
    pub today_focus_min: u64,
}

/// SQLite database for focus sessions.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/focusdesk.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("focusdesk.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (tests and dry runs).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert a focus session and return its generated id.
    pub fn insert_session(&self, session: &NewSession) -> Result<SessionId, DatabaseError> {
        let id = SessionId(uuid::Uuid::new_v4().to_string());
        self.conn.execute(
            "INSERT INTO focus_sessions (id, user_id, duration, actual_duration, completed, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.as_str(),
                session.user_id.as_str(),
                session.duration,
                session.actual_duration,
                session.completed,
                session.notes,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Rewrite the mutable fields of a session.
    ///
    /// # Errors
    /// Returns `QueryFailed` when no row has the given id.
    pub fn update_session(&self, id: &SessionId, update: &SessionUpdate) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE focus_sessions
             SET completed = ?2, actual_duration = ?3, notes = ?4
             WHERE id = ?1",
            params![id.as_str(), update.completed, update.actual_duration, update.notes],
        )?;
        if changed == 0 {
            return Err(DatabaseError::QueryFailed(format!("no focus session with id {id}")));
        }
        Ok(())
    }

    /// Insert all task links for a session in one transaction.
    pub fn link_tasks(&self, session_id: &SessionId, task_ids: &[TaskId]) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO focus_session_tasks (id, session_id, task_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let now = Utc::now().to_rfc3339();
            for task_id in task_ids {
                stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    session_id.as_str(),
                    task_id.as_str(),
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Option<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, duration, actual_duration, completed, notes, created_at
             FROM focus_sessions WHERE id = ?1",
        )?;
        Ok(stmt.query_row(params![id.as_str()], row_to_record).optional()?)
    }

    /// Most recent sessions first.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, duration, actual_duration, completed, notes, created_at
             FROM focus_sessions
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_record)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn session_tasks(&self, session_id: &SessionId) -> Result<Vec<TaskId>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id FROM focus_session_tasks WHERE session_id = ?1 ORDER BY task_id",
        )?;
        let rows = stmt.query_map(params![session_id.as_str()], |row| {
            row.get::<_, String>(0).map(TaskId)
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Totals across all sessions plus today's (UTC) share.
    pub fn stats(&self) -> Result<Stats, DatabaseError> {
        let (total_sessions, completed_sessions, total_focus_min) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0), COALESCE(SUM(actual_duration), 0)
             FROM focus_sessions",
            [],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?, row.get::<_, u64>(2)?)),
        )?;

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let (today_sessions, today_focus_min) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(actual_duration), 0)
             FROM focus_sessions
             WHERE created_at >= ?1",
            params![format!("{today}T00:00:00+00:00")],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, u64>(1)?)),
        )?;

        Ok(Stats {
            total_sessions,
            completed_sessions,
            total_focus_min,
            today_sessions,
            today_focus_min,
        })
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        Ok(stmt
            .query_row(params![key], |row| row.get::<_, String>(0))
            .optional()?)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;
    Ok(SessionRecord {
        id: SessionId(row.get(0)?),
        user_id: row.get(1)?,
        duration: row.get(2)?,
        actual_duration: row.get(3)?,
        completed: row.get(4)?,
        notes: row.get(5)?,
        created_at,
    })
}
