mod config;
pub mod database;
pub mod local;
pub mod migrations;
pub mod remote;

pub use config::{
    AccountConfig, Config, NotificationsConfig, RemoteConfig, StorageBackend, StorageConfig,
    TimerConfig,
};
pub use database::{Database, SessionRecord, Stats};
pub use local::LocalStore;
pub use remote::RemoteStore;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `FOCUSDESK_HOME` overrides the location outright. Otherwise the directory
/// is `~/.config/focusdesk/`, or `~/.config/focusdesk-dev/` when
/// `FOCUSDESK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSDESK_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("FOCUSDESK_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("focusdesk-dev")
            } else {
                base_dir.join("focusdesk")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
