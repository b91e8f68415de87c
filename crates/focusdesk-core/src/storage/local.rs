//! Shared handle to the local database.
//!
//! Adapts the synchronous [`Database`] to the async [`SessionStore`]
//! contract by running each call on the blocking pool.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::Database;
use crate::error::{CoreError, DatabaseError, PersistenceError, Result};
use crate::preferences::PreferenceStore;
use crate::session::{NewSession, SessionId, SessionStore, SessionUpdate, TaskId};

#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
}

impl LocalStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run `f` against the database on the current thread.
    pub fn with_db<R>(
        &self,
        f: impl FnOnce(&Database) -> Result<R, DatabaseError>,
    ) -> Result<R, DatabaseError> {
        let db = self.db.lock().map_err(|_| DatabaseError::Poisoned)?;
        f(&db)
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R, PersistenceError>
    where
        R: Send + 'static,
        F: FnOnce(&Database) -> Result<R, DatabaseError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let result = tokio::task::spawn_blocking(move || {
            let db = db.lock().map_err(|_| DatabaseError::Poisoned)?;
            f(&db)
        })
        .await?;
        Ok(result?)
    }
}

#[async_trait]
impl SessionStore for LocalStore {
    async fn create_session(&self, session: &NewSession) -> Result<SessionId, PersistenceError> {
        let session = session.clone();
        self.blocking(move |db| db.insert_session(&session)).await
    }

    async fn update_session(
        &self,
        id: &SessionId,
        update: &SessionUpdate,
    ) -> Result<(), PersistenceError> {
        let id = id.clone();
        let update = update.clone();
        self.blocking(move |db| db.update_session(&id, &update)).await
    }

    async fn link_tasks(
        &self,
        session_id: &SessionId,
        task_ids: &[TaskId],
    ) -> Result<(), PersistenceError> {
        let session_id = session_id.clone();
        let task_ids = task_ids.to_vec();
        self.blocking(move |db| db.link_tasks(&session_id, &task_ids))
            .await
    }
}

impl PreferenceStore for LocalStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        let value = self.with_db(|db| db.kv_get(key))?;
        match value.as_deref() {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(CoreError::Database(DatabaseError::QueryFailed(format!(
                "preference '{key}' holds non-boolean value '{other}'"
            )))),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        let value = if value { "true" } else { "false" };
        self.with_db(|db| db.kv_set(key, value))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{SoundPreference, SOUND_PREFERENCE_KEY};
    use crate::session::UserId;

    #[tokio::test]
    async fn store_round_trips_through_blocking_pool() {
        let store = LocalStore::new(Database::open_memory().unwrap());
        let id = store
            .create_session(&NewSession {
                user_id: UserId::from("u1"),
                duration: 30,
                actual_duration: 0,
                completed: false,
                notes: String::new(),
            })
            .await
            .unwrap();
        store
            .link_tasks(&id, &[TaskId::from("t1")])
            .await
            .unwrap();
        store
            .update_session(
                &id,
                &SessionUpdate {
                    completed: true,
                    actual_duration: 30,
                    notes: "essay".into(),
                },
            )
            .await
            .unwrap();

        let record = store.with_db(|db| db.get_session(&id)).unwrap().unwrap();
        assert!(record.completed);
        assert_eq!(
            store.with_db(|db| db.session_tasks(&id)).unwrap(),
            vec![TaskId::from("t1")]
        );
    }

    #[test]
    fn sound_preference_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.db");

        let store = LocalStore::new(Database::open_at(&path).unwrap());
        let pref = SoundPreference::load(Arc::new(store));
        assert!(pref.enabled());
        pref.toggle();
        drop(pref);

        let reopened = LocalStore::new(Database::open_at(&path).unwrap());
        assert_eq!(reopened.get_bool(SOUND_PREFERENCE_KEY).unwrap(), Some(false));
    }
}
