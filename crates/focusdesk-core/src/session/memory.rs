//! In-process session store.
//!
//! Keeps every call in order so tests (and `--dry-run`) can inspect exactly
//! what the writer sent.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{NewSession, SessionId, SessionStore, SessionUpdate, TaskId};
use crate::error::PersistenceError;

/// A single recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create(NewSession),
    Update(SessionId, SessionUpdate),
    Link(SessionId, Vec<TaskId>),
}

#[derive(Debug, Clone)]
struct Row {
    session: NewSession,
    task_ids: Vec<TaskId>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    calls: Mutex<Vec<StoreCall>>,
    rows: Mutex<BTreeMap<SessionId, Row>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a transport-like error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every call, to exercise ordering under slow writes.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.latency.lock() {
            *guard = latency;
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn insert_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Create(_)))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StoreCall::Update(..)))
            .count()
    }

    /// Current contents of a row, with updates applied.
    pub fn row(&self, id: &SessionId) -> Option<NewSession> {
        self.rows.lock().ok()?.get(id).map(|r| r.session.clone())
    }

    pub fn linked_tasks(&self, id: &SessionId) -> Vec<TaskId> {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.get(id).map(|r| r.task_ids.clone()))
            .unwrap_or_default()
    }

    /// The only row, if exactly one exists.
    pub fn single_row(&self) -> Option<(SessionId, NewSession)> {
        let rows = self.rows.lock().ok()?;
        if rows.len() != 1 {
            return None;
        }
        rows.iter()
            .next()
            .map(|(id, row)| (id.clone(), row.session.clone()))
    }

    async fn enter(&self, call: StoreCall) -> Result<(), PersistenceError> {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Http {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &NewSession) -> Result<SessionId, PersistenceError> {
        self.enter(StoreCall::Create(session.clone())).await?;
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = SessionId(format!("session-{n}"));
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(
                id.clone(),
                Row {
                    session: session.clone(),
                    task_ids: Vec::new(),
                },
            );
        }
        Ok(id)
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<(), PersistenceError> {
        self.enter(StoreCall::Update(id.clone(), update.clone()))
            .await?;
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| PersistenceError::Join("memory store poisoned".into()))?;
        let row = rows
            .get_mut(id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        row.session.completed = update.completed;
        row.session.actual_duration = update.actual_duration;
        row.session.notes = update.notes.clone();
        Ok(())
    }

    async fn link_tasks(
        &self,
        session_id: &SessionId,
        task_ids: &[TaskId],
    ) -> Result<(), PersistenceError> {
        self.enter(StoreCall::Link(session_id.clone(), task_ids.to_vec()))
            .await?;
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| PersistenceError::Join("memory store poisoned".into()))?;
        let row = rows
            .get_mut(session_id)
            .ok_or_else(|| PersistenceError::NotFound(session_id.to_string()))?;
        row.task_ids.extend_from_slice(task_ids);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserId;

    fn new_session() -> NewSession {
        NewSession {
            user_id: UserId::from("u1"),
            duration: 25,
            actual_duration: 0,
            completed: false,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_then_update_rewrites_row() {
        let store = MemoryStore::new();
        let id = store.create_session(&new_session()).await.unwrap();
        store
            .update_session(
                &id,
                &SessionUpdate {
                    completed: true,
                    actual_duration: 25,
                    notes: "done".into(),
                },
            )
            .await
            .unwrap();

        let row = store.row(&id).unwrap();
        assert!(row.completed);
        assert_eq!(row.actual_duration, 25);
        assert_eq!(store.insert_count(), 1);
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_row_fails() {
        let store = MemoryStore::new();
        let result = store
            .update_session(
                &SessionId::from("missing"),
                &SessionUpdate {
                    completed: false,
                    actual_duration: 0,
                    notes: String::new(),
                },
            )
            .await;
        assert!(matches!(result, Err(PersistenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn failing_store_still_records_attempts() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(store.create_session(&new_session()).await.is_err());
        assert_eq!(store.insert_count(), 1);
        assert!(store.single_row().is_none());
    }
}
