//! Per-run serialized persistence.
//!
//! Each run gets one writer task that drains its queue in order. The task
//! owns the run's persisted id: the first successful save inserts and links
//! tasks, every later save updates that same row. Because one task handles
//! the whole queue, an update can never be issued before the insert that
//! produced its id has returned.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Identity, SaveRequest, SessionId, SessionStore};

/// Called once with the id of the freshly inserted row.
pub type PersistedCallback = Box<dyn Fn(u64, SessionId) + Send + Sync>;

enum WriterMsg {
    Save(SaveRequest),
    Flush(oneshot::Sender<()>),
}

/// Handle to a run's writer task.
///
/// Dropping (or [`retire`](Self::retire)-ing) the handle closes the queue;
/// writes already queued still run to completion.
pub struct SessionWriter {
    tx: mpsc::UnboundedSender<WriterMsg>,
    handle: JoinHandle<()>,
}

impl SessionWriter {
    /// Spawn a writer on `runtime`.
    pub fn spawn(
        runtime: &tokio::runtime::Handle,
        store: Arc<dyn SessionStore>,
        identity: Arc<dyn Identity>,
        on_persisted: PersistedCallback,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = runtime.spawn(drain(rx, store, identity, on_persisted));
        Self { tx, handle }
    }

    /// Queue a save. Never blocks.
    pub fn submit(&self, request: SaveRequest) {
        if self.tx.send(WriterMsg::Save(request)).is_err() {
            warn!("session writer stopped; save dropped");
        }
    }

    /// Resolves once every save queued before this call has been attempted.
    pub fn flush_signal(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.tx.send(WriterMsg::Flush(tx));
        rx
    }

    /// Close the queue and hand back the task so callers may await it.
    pub fn retire(self) -> JoinHandle<()> {
        drop(self.tx);
        self.handle
    }
}

async fn drain(
    mut rx: mpsc::UnboundedReceiver<WriterMsg>,
    store: Arc<dyn SessionStore>,
    identity: Arc<dyn Identity>,
    on_persisted: PersistedCallback,
) {
    let mut session_id: Option<SessionId> = None;

    while let Some(msg) = rx.recv().await {
        let request = match msg {
            WriterMsg::Save(request) => request,
            WriterMsg::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let Some(user_id) = identity.current_user() else {
            debug!(run_id = request.run_id, "no signed-in user; skipping session save");
            continue;
        };

        match &session_id {
            Some(id) => match store.update_session(id, &request.to_update()).await {
                Ok(()) => debug!(
                    session_id = %id,
                    completed = request.completed,
                    actual_min = request.actual_duration_min,
                    "focus session updated"
                ),
                Err(e) => warn!(session_id = %id, "failed to update focus session: {e}"),
            },
            None => {
                let row = request.to_new_session(user_id);
                let id = match store.create_session(&row).await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(run_id = request.run_id, "failed to create focus session: {e}");
                        continue;
                    }
                };
                info!(session_id = %id, run_id = request.run_id, "focus session created");

                if !request.task_ids.is_empty() {
                    if let Err(e) = store.link_tasks(&id, &request.task_ids).await {
                        warn!(session_id = %id, "failed to link tasks to focus session: {e}");
                    }
                }
                on_persisted(request.run_id, id.clone());
                session_id = Some(id);
            }
        }
    }
}
