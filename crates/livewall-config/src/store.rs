//! Shared app config with cross-process locking.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ConfigError, ConfigResult};

/// The engine/launcher shared configuration (`app_config.json`).
///
/// Both processes rewrite this file, so every field either side does not
/// understand is kept in `extra` and written back verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Id of the theme currently selected as wallpaper.
    #[serde(default)]
    pub active_theme: String,

    /// Control-plane HTTP port the engine binds (or last bound).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Telemetry push-channel port, present only while the widget is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_port: Option<u16>,

    /// Whether the launcher auto-starts the engine.
    #[serde(default = "default_auto_start")]
    pub auto_start: bool,

    /// Fields owned by other consumers, preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_port() -> u16 {
    60600
}

fn default_auto_start() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            active_theme: String::new(),
            port: default_port(),
            ws_port: None,
            auto_start: default_auto_start(),
            extra: serde_json::Map::new(),
        }
    }
}

/// Serialized access to the shared config file.
///
/// Two layers of exclusion: an in-process mutex so the engine's own threads
/// serialize, and an advisory file lock so the launcher process and the
/// engine never interleave a read-modify-write. The file lock is held only
/// for the duration of the critical section, never across anything that can
/// block indefinitely.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl ConfigStore {
    /// Creates a store for the given config file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// The underlying file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the config, falling back to defaults if missing or corrupt.
    ///
    /// A broken shared file is a recoverable condition: the launcher may be
    /// mid-write or the file may never have existed.
    pub fn load(&self) -> EngineConfig {
        let _guard = self.guard.lock();

        match self.locked_read() {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "app config unreadable, using defaults");
                    EngineConfig::default()
                }
            },
            Ok(None) => EngineConfig::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "app config inaccessible, using defaults");
                EngineConfig::default()
            }
        }
    }

    /// Reads the raw file bytes under the cross-process lock.
    ///
    /// Used by the control plane to serve the file verbatim.
    pub fn raw_bytes(&self) -> ConfigResult<Vec<u8>> {
        let _guard = self.guard.lock();
        self.locked_read()?
            .ok_or_else(|| ConfigError::io(&self.path, std::io::Error::from(std::io::ErrorKind::NotFound)))
    }

    /// Applies `f` to the current config and persists the result.
    ///
    /// The whole read-modify-write cycle runs under the file lock; unknown
    /// fields survive through [`EngineConfig::extra`].
    pub fn update<F>(&self, f: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut EngineConfig),
    {
        let _guard = self.guard.lock();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e))?;
        let _lock = FileLock::acquire(&file, &self.path)?;

        let mut bytes = Vec::new();
        let mut reader = &file;
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ConfigError::io(&self.path, e))?;

        let mut config: EngineConfig = if bytes.is_empty() {
            EngineConfig::default()
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "rewriting unreadable app config");
                EngineConfig::default()
            })
        };

        f(&mut config);

        let out = serde_json::to_vec_pretty(&config).map_err(|e| ConfigError::json(&self.path, e))?;
        let mut writer = &file;
        writer
            .seek(SeekFrom::Start(0))
            .and_then(|_| file.set_len(0))
            .and_then(|_| writer.write_all(&out))
            .map_err(|e| ConfigError::io(&self.path, e))?;

        Ok(())
    }

    /// Reads the file under the advisory lock. `None` when absent.
    fn locked_read(&self) -> ConfigResult<Option<Vec<u8>>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };
        let _lock = FileLock::acquire_shared(&file, &self.path)?;

        let mut bytes = Vec::new();
        let mut reader = &file;
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| ConfigError::io(&self.path, e))?;
        Ok(Some(bytes))
    }
}

/// RAII guard for the advisory file lock.
struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    fn acquire(file: &'a File, path: &PathBuf) -> ConfigResult<Self> {
        file.lock().map_err(|e| ConfigError::io(path, e))?;
        Ok(Self { file })
    }

    fn acquire_shared(file: &'a File, path: &PathBuf) -> ConfigResult<Self> {
        file.lock_shared().map_err(|e| ConfigError::io(path, e))?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("app_config.json"));

        let config = store.load();
        assert_eq!(config.active_theme, "");
        assert_eq!(config.port, 60600);
        assert!(config.auto_start);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        std::fs::write(&path, b"{not json").unwrap();

        let config = ConfigStore::new(&path).load();
        assert_eq!(config.port, 60600);
    }

    #[test]
    fn update_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        std::fs::write(
            &path,
            br#"{"active_theme":"aurora","port":1234,"auto_start":false,"launcher_geometry":[10,20]}"#,
        )
        .unwrap();

        let store = ConfigStore::new(&path);
        store.update(|c| c.port = 60601).unwrap();

        let reread: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(reread["port"], 60601);
        assert_eq!(reread["active_theme"], "aurora");
        assert_eq!(reread["launcher_geometry"], serde_json::json!([10, 20]));
    }

    #[test]
    fn update_can_remove_ws_port() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        std::fs::write(&path, br#"{"active_theme":"a","port":1,"ws_port":2,"auto_start":true}"#)
            .unwrap();

        let store = ConfigStore::new(&path);
        store.update(|c| c.ws_port = None).unwrap();

        let reread: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(reread.get("ws_port").is_none());
    }

    #[test]
    fn raw_bytes_round_trips_file_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app_config.json");
        std::fs::write(&path, br#"{"port":7}"#).unwrap();

        let bytes = ConfigStore::new(&path).raw_bytes().unwrap();
        assert_eq!(bytes, br#"{"port":7}"#);
    }
}
