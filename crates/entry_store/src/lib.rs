mod medium;

use std::path::PathBuf;
use std::sync::Arc;

use journal_types::{Entry, EntryDate};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

pub use medium::{FileMedium, MediumError, MemoryMedium, StorageMedium};

pub const DEFAULT_STORAGE_KEY: &str = "mmoc_entries_v3";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write entries under `{key}`: {source}")]
    StorageWriteFailed {
        key: String,
        #[source]
        source: WriteFailure,
    },
}

#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error(transparent)]
    Medium(#[from] MediumError),
    #[error("failed to serialize entries: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub struct EntryStore {
    medium: Arc<dyn StorageMedium>,
    key: String,
    // Serializes read-modify-write cycles issued through this handle.
    write_lock: Mutex<()>,
}

impl EntryStore {
    pub fn new(medium: Arc<dyn StorageMedium>, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn open_dir(dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self::new(Arc::new(FileMedium::new(dir)), key)
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryMedium::new()), DEFAULT_STORAGE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw items of the stored array. Anything unreadable reads as empty.
    fn read_items(&self) -> Vec<Value> {
        let raw = match self.medium.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "entry storage unreadable, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                warn!(key = %self.key, "entry storage is not an array, treating as empty");
                Vec::new()
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "entry storage malformed, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn list(&self) -> Vec<Entry> {
        let items = self.read_items();
        let total = items.len();
        let mut entries: Vec<Entry> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if entries.len() != total {
            debug!(
                key = %self.key,
                skipped = total - entries.len(),
                "skipped undecodable entries"
            );
        }
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
    }

    pub fn get_by_date(&self, date: &EntryDate) -> Option<Entry> {
        self.list().into_iter().find(|entry| &entry.date == date)
    }

    /// Works on the raw array so items that do not decode are kept.
    pub fn upsert(&self, entry: Entry) -> Result<(), StoreError> {
        let value = serde_json::to_value(&entry).map_err(|err| self.write_failed(err.into()))?;
        let _guard = self.write_lock.lock();
        let mut items = self.read_items();
        match items
            .iter_mut()
            .find(|item| item_date(item) == Some(entry.date.as_str()))
        {
            Some(existing) => *existing = value,
            None => items.push(value),
        }
        sort_newest_first(&mut items);
        self.write_all(&items)
    }

    /// Deletes the item for `date`. Returns whether one existed.
    pub fn remove(&self, date: &EntryDate) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock();
        let mut items = self.read_items();
        let before = items.len();
        items.retain(|item| item_date(item) != Some(date.as_str()));
        if items.len() == before {
            return Ok(false);
        }
        self.write_all(&items)?;
        Ok(true)
    }

    fn write_failed(&self, source: WriteFailure) -> StoreError {
        StoreError::StorageWriteFailed {
            key: self.key.clone(),
            source,
        }
    }

    fn write_all(&self, items: &[Value]) -> Result<(), StoreError> {
        let text = serde_json::to_string(items).map_err(|err| self.write_failed(err.into()))?;
        self.medium
            .write(&self.key, &text)
            .map_err(|err| self.write_failed(err.into()))?;
        debug!(key = %self.key, count = items.len(), bytes = text.len(), "entries written");
        Ok(())
    }
}

fn item_date(item: &Value) -> Option<&str> {
    item.get("date")?.as_str()
}

// Items without a string date sort as "" and so sink to the end.
fn sort_newest_first(items: &mut [Value]) {
    items.sort_by(|a, b| item_date(b).unwrap_or("").cmp(item_date(a).unwrap_or("")));
}
