mod config;
pub mod database;
mod memory;
mod state_store;

pub use config::{NotificationSettings, Settings, TimerSettings, MAX_INTERVAL_SECS};
pub use database::SqliteStore;
pub use memory::MemoryStore;
pub use state_store::{
    DayCount, StateStore, ENDS_AT_KEY, FIRE_DATE_KEY, MAX_HISTORY_DAYS, PAUSED_TIME_KEY, STATE_KEY,
};

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// Durable key-value persistence.
///
/// Every call is synchronous and independent; nothing is atomic across
/// keys. Values are stored as strings and the typed accessors are layered
/// on top.
pub trait KeyValueStore: Send {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_raw(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_key(&mut self, key: &str) -> Result<(), StorageError>;

    /// Integer at `key`. An unparsable value reads as absent.
    fn get_int(&self, key: &str) -> Result<Option<i64>, StorageError> {
        Ok(self.get_raw(key)?.and_then(|v| v.trim().parse().ok()))
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), StorageError> {
        self.set_raw(key, &value.to_string())
    }

    /// JSON value at `key`. An unparsable value reads as absent.
    fn get_object(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        Ok(self
            .get_raw(key)?
            .and_then(|v| serde_json::from_str(&v).ok()))
    }

    fn set_object(&mut self, key: &str, value: &serde_json::Value) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|e| StorageError::Encoding {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.set_raw(key, &encoded)
    }
}

/// Returns `~/.config/pomodoro-flow[-dev]/`.
///
/// `POMODORO_FLOW_DATA_DIR` overrides the location outright; otherwise
/// `POMODORO_FLOW_ENV=dev` selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMODORO_FLOW_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("POMODORO_FLOW_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomodoro-flow-dev")
            } else {
                base_dir.join("pomodoro-flow")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
