//! Key-value persistence for settings and the associated task

use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, TimerError},
    state::{TaskId, TimerConfig},
};

/// Key holding the serialized [`TimerConfig`].
pub const SETTINGS_KEY: &str = "pomodoroSettings";
/// Key holding the last selected task id, or `none`.
pub const TASK_KEY: &str = "currentPomodoroTask";

/// Minimal string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Store that keeps every key in one JSON object on disk.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(map)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, updater: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| TimerError::LockPoisoned("store file"))?;

        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(TimerError::Json(e)) => {
                warn!("Discarding malformed store file {}: {}", self.path.display(), e);
                HashMap::new()
            }
            Err(e) => return Err(e),
        };
        updater(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| TimerError::LockPoisoned("store file"))?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!("Writing {} to {}", key, self.path.display());
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }
}

/// Volatile store, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| TimerError::LockPoisoned("memory store"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| TimerError::LockPoisoned("memory store"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load persisted settings. Missing or unreadable data yields defaults.
pub fn load_config(store: &dyn KeyValueStore) -> TimerConfig {
    match store.get(SETTINGS_KEY) {
        Ok(Some(raw)) => match TimerConfig::from_json_str(&raw) {
            Ok(config) => {
                info!("Loaded timer settings: {:?}", config);
                config
            }
            Err(e) => {
                warn!("Stored timer settings are malformed, using defaults: {}", e);
                TimerConfig::default()
            }
        },
        Ok(None) => TimerConfig::default(),
        Err(e) => {
            warn!("Failed to read timer settings, using defaults: {}", e);
            TimerConfig::default()
        }
    }
}

pub fn save_config(store: &dyn KeyValueStore, config: &TimerConfig) -> Result<()> {
    store.set(SETTINGS_KEY, &serde_json::to_string(config)?)
}

/// Load the persisted task association, if any.
pub fn load_task(store: &dyn KeyValueStore) -> Option<TaskId> {
    match store.get(TASK_KEY) {
        Ok(raw) => raw.as_deref().and_then(TaskId::parse),
        Err(e) => {
            warn!("Failed to read associated task: {}", e);
            None
        }
    }
}

pub fn save_task(store: &dyn KeyValueStore, task: Option<&TaskId>) -> Result<()> {
    match task {
        Some(task) => store.set(TASK_KEY, task.as_str()),
        None => store.set(TASK_KEY, "none"),
    }
}
