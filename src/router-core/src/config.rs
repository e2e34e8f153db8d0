//! Process-singleton access to the on-disk `config.yaml` and the other
//! persisted stores under the config directory. Mirrors the atomic
//! read-modify-write discipline used throughout this crate: load under a
//! lock, mutate a clone, write to a temp file, rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use once_cell::sync::OnceCell;
use softrouter_lib::types::config::ConfigFile;
use thiserror::Error;

pub static CONFIG_DIR: OnceCell<PathBuf> = OnceCell::new();

static CONFIG: OnceCell<RwLock<ConfigFile>> = OnceCell::new();

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not initialized")]
    NotInitialized,
    #[error("io error reading {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("io error writing {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("invalid config YAML: {0}")]
    Parse(#[from] serde_yml::Error),
}

pub fn config_dir() -> Result<&'static Path, ConfigError> {
    CONFIG_DIR
        .get()
        .map(|p| p.as_path())
        .ok_or(ConfigError::NotInitialized)
}

pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.yaml"))
}

/// Loads `config.yaml` from disk into the process-singleton cache.
/// Called once at startup; later calls are no-ops if already initialized.
pub fn init() -> Result<(), ConfigError> {
    if CONFIG.get().is_some() {
        return Ok(());
    }
    let path = config_file_path()?;
    let file = if path.exists() {
        let raw = fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        serde_yml::from_str(&raw)?
    } else {
        ConfigFile::default()
    };
    let _ = CONFIG.set(RwLock::new(file));
    Ok(())
}

pub fn get_config() -> Result<ConfigFile, ConfigError> {
    Ok(CONFIG
        .get()
        .ok_or(ConfigError::NotInitialized)?
        .read()
        .expect("config lock poisoned")
        .clone())
}

/// Applies `mutator` to the in-memory config and persists the result
/// atomically (write to `.tmp`, then rename) before releasing the lock.
pub fn update_config<F>(mutator: F) -> Result<ConfigFile, ConfigError>
where
    F: FnOnce(&mut ConfigFile),
{
    let lock = CONFIG.get().ok_or(ConfigError::NotInitialized)?;
    let mut guard = lock.write().expect("config lock poisoned");
    mutator(&mut guard);
    write_atomic(&config_file_path()?, &*guard)?;
    Ok(guard.clone())
}

/// Generic atomic-write helper shared by every persisted store in this
/// crate: serialize, write to a sibling `.tmp` file, `fsync`, rename.
pub fn write_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
    }
    let tmp_path = path.with_extension("tmp");
    let is_yaml = path.extension().and_then(|e| e.to_str()) == Some("yaml");
    let serialized = if is_yaml {
        serde_yml::to_string(value).map_err(ConfigError::Parse)?
    } else {
        serde_json::to_string_pretty(value)
            .map_err(|e| ConfigError::Write(path.to_path_buf(), std::io::Error::other(e)))?
    };
    {
        let mut f = fs::File::create(&tmp_path).map_err(|e| ConfigError::Write(tmp_path.clone(), e))?;
        use std::io::Write;
        f.write_all(serialized.as_bytes())
            .map_err(|e| ConfigError::Write(tmp_path.clone(), e))?;
        f.sync_all().map_err(|e| ConfigError::Write(tmp_path.clone(), e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        ConfigError::Write(path.to_path_buf(), e)
    })
}

/// Self-healing JSON load: missing file returns `default`, corrupted file
/// is deleted and `default` is returned, matching the mode-state
/// recovery behavior this pattern is grounded on.
pub fn load_json_or_default<T>(path: &Path, default: T) -> T
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return default;
    }
    match fs::read_to_string(path) {
        Ok(raw) if raw.trim().is_empty() => default,
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                log::warn!(
                    "{:?} is corrupted ({}); deleting for self-recovery",
                    path,
                    e
                );
                let _ = fs::remove_file(path);
                default
            }
        },
        Err(e) => {
            log::warn!("failed reading {:?}: {}", path, e);
            default
        }
    }
}
