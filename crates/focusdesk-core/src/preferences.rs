//! Durable user preferences.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

use crate::error::Result;

/// Key of the completion-sound toggle.
pub const SOUND_PREFERENCE_KEY: &str = "focus_timer_sound_enabled";

/// Boolean key-value storage that survives restarts.
pub trait PreferenceStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    fn set_bool(&self, key: &str, value: bool) -> Result<()>;
}

/// Non-durable store for tests.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<HashMap<String, bool>>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.values().get(key).copied())
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.values().insert(key.to_string(), value);
        Ok(())
    }
}

/// Process-wide completion-sound toggle. Defaults to enabled.
///
/// The value is cached; writes go through to the store, and a failed write
/// still flips the in-memory value.
pub struct SoundPreference {
    store: Arc<dyn PreferenceStore>,
    enabled: AtomicBool,
}

impl SoundPreference {
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let enabled = match store.get_bool(SOUND_PREFERENCE_KEY) {
            Ok(value) => value.unwrap_or(true),
            Err(e) => {
                warn!("failed to read sound preference, defaulting to on: {e}");
                true
            }
        };
        Self {
            store,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        if let Err(e) = self.store.set_bool(SOUND_PREFERENCE_KEY, enabled) {
            warn!("failed to persist sound preference: {e}");
        }
    }

    /// Flip the toggle and return the new value.
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        if let Err(e) = self.store.set_bool(SOUND_PREFERENCE_KEY, enabled) {
            warn!("failed to persist sound preference: {e}");
        }
        enabled
    }
}
