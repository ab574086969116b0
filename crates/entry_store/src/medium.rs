use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediumError {
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("storage quota exceeded: {needed} bytes requested, {limit} allowed")]
    QuotaExceeded { needed: usize, limit: usize },
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
}

/// `write` replaces the whole value; readers never see a partial write.
pub trait StorageMedium: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, MediumError>;
    fn write(&self, key: &str, value: &str) -> Result<(), MediumError>;
}

/// One JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: PathBuf,
}

impl FileMedium {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MediumError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(MediumError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl StorageMedium for FileMedium {
    fn read(&self, key: &str) -> Result<Option<String>, MediumError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(MediumError::Io { path, source }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let path = self.path_for(key)?;
        let io_err = |source: io::Error| MediumError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| MediumError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Stage next to the target so the rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        staged.write_all(value.as_bytes()).map_err(io_err)?;
        staged.as_file().sync_all().map_err(io_err)?;
        staged.persist(&path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

/// Process-local medium with an optional byte quota across all keys.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    values: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            values: Mutex::default(),
            quota: Some(limit),
        }
    }
}

impl StorageMedium for MemoryMedium {
    fn read(&self, key: &str) -> Result<Option<String>, MediumError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), MediumError> {
        let mut values = self.values.lock();
        if let Some(limit) = self.quota {
            let others: usize = values
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(MediumError::QuotaExceeded { needed, limit });
            }
        }
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
