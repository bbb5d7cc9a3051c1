//! Key-value storage for volume levels across restarts.
//!
//! [`VolumeStore`] is the boundary the engine writes through. Failures are
//! reported as errors here; the engine logs and swallows them.

use crate::error::{Result, TuneboxError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// File name used by [`JsonFileStore::open_default`].
pub const SETTINGS_FILE_NAME: &str = "audio_settings.json";

pub trait VolumeStore {
    fn has(&self, key: &str) -> bool;

    fn get(&self, key: &str, default: f32) -> f32;

    fn set(&mut self, key: &str, value: f32) -> Result<()>;

    /// Stored value for `key`, if any.
    fn load(&self, key: &str) -> Option<f32> {
        self.has(key).then(|| self.get(key, 1.0))
    }

    fn save(&mut self, key: &str, value: f32) -> Result<()> {
        self.set(key, value)
    }
}

/// In-memory store. Clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, f32>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl VolumeStore for MemoryStore {
    fn has(&self, key: &str) -> bool {
        self.values
            .lock()
            .map(|v| v.contains_key(key))
            .unwrap_or(false)
    }

    fn get(&self, key: &str, default: f32) -> f32 {
        self.values
            .lock()
            .ok()
            .and_then(|v| v.get(key).copied())
            .unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: f32) -> Result<()> {
        self.values
            .lock()
            .map_err(|_| TuneboxError::Persistence("memory store poisoned".to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: HashMap<String, f32>,
}

impl JsonFileStore {
    /// Opens `path`. A missing file is an empty store; it is created on the first `set`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            HashMap::new()
        };

        log::debug!("Opened volume store at {}", path.display());
        Ok(Self { path, values })
    }

    /// Opens `<config dir>/<app_name>/audio_settings.json`.
    pub fn open_default(app_name: &str) -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            TuneboxError::Persistence("No platform config directory available".to_string())
        })?;
        Self::open(dir.join(app_name).join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl VolumeStore for JsonFileStore {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn get(&self, key: &str, default: f32) -> f32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set(&mut self, key: &str, value: f32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }
}
