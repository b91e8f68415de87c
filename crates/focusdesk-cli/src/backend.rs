//! Wires the configured session store, preference store and identity.

use std::sync::Arc;

use focusdesk_core::preferences::PreferenceStore;
use focusdesk_core::session::{MemoryStore, SessionStore};
use focusdesk_core::storage::{Config, Database, LocalStore, RemoteStore, StorageBackend};
use focusdesk_core::StaticIdentity;

pub struct Backend {
    pub store: Arc<dyn SessionStore>,
    pub preferences: Arc<dyn PreferenceStore>,
    pub identity: StaticIdentity,
    /// Present for `--dry-run`, so the caller can report what would be written.
    pub dry_run: Option<Arc<MemoryStore>>,
}

/// Preferences always live in the local database; sessions go wherever
/// `storage.backend` points.
pub fn open(config: &Config, dry_run: bool) -> Result<Backend, Box<dyn std::error::Error>> {
    let local = LocalStore::new(Database::open()?);
    let preferences: Arc<dyn PreferenceStore> = Arc::new(local.clone());
    let identity = StaticIdentity::from_config(&config.account.user_id);

    if dry_run {
        let memory = Arc::new(MemoryStore::new());
        return Ok(Backend {
            store: memory.clone(),
            preferences,
            identity,
            dry_run: Some(memory),
        });
    }

    let store: Arc<dyn SessionStore> = match config.storage.backend {
        StorageBackend::Local => Arc::new(local),
        StorageBackend::Remote => {
            if config.remote.url.trim().is_empty() {
                return Err("storage.backend is \"remote\" but remote.url is not set".into());
            }
            Arc::new(
                RemoteStore::new(&config.remote.url, config.remote.api_key.clone())?
                    .with_access_token(config.remote.access_token.clone()),
            )
        }
    };

    Ok(Backend {
        store,
        preferences,
        identity,
        dry_run: None,
    })
}
