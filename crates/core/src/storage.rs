//! Flat-file JSON collections.
//!
//! Every concern (titles, tokens, requests, users, ...) lives in its own JSON
//! file. A collection is loaded fully at open, held in memory behind a single
//! mutex, and rewritten in full on every committed mutation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info};

/// Errors shared by all storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error on {path}: {message}")]
    Serialization { path: String, message: String },

    #[error("Collection lock poisoned: {0}")]
    Poisoned(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Outcome of a [`JsonCollection::write`] closure.
pub enum Change<R> {
    /// Rewrite the file and keep the mutated value.
    Persist(R),
    /// Drop the mutated value; nothing is written.
    Discard(R),
}

/// A single JSON document on disk with an in-memory copy.
pub struct JsonCollection<T> {
    path: PathBuf,
    data: Mutex<T>,
}

impl<T> JsonCollection<T>
where
    T: Serialize + DeserializeOwned + Default + Clone,
{
    /// Open the collection at `path`, creating it with `T::default()` when missing.
    ///
    /// A file that exists but does not parse is an error; it is never
    /// replaced with an empty collection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let data = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| io_error(&path, e))?;
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization {
                path: path.display().to_string(),
                message: e.to_string(),
            })?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
                }
            }
            let initial = T::default();
            write_atomically(&path, &initial)?;
            info!("Initialized {}", path.display());
            initial
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Run a read-only closure against the current contents.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, StorageError> {
        let guard = self
            .data
            .lock()
            .map_err(|_| StorageError::Poisoned(self.path.display().to_string()))?;
        Ok(f(&guard))
    }

    /// Run a mutating closure against a copy of the contents.
    ///
    /// On [`Change::Persist`] the copy is written to disk and, only once the
    /// write succeeded, replaces the in-memory value. The lock is held for the
    /// whole cycle, so a closure observes and commits atomically with respect
    /// to every other caller of this collection.
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> Change<R>) -> Result<R, StorageError> {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| StorageError::Poisoned(self.path.display().to_string()))?;

        let mut next = guard.clone();
        match f(&mut next) {
            Change::Persist(result) => {
                if let Err(e) = write_atomically(&self.path, &next) {
                    error!("Error saving to {}: {}", self.path.display(), e);
                    return Err(e);
                }
                *guard = next;
                Ok(result)
            }
            Change::Discard(result) => Ok(result),
        }
    }
}

/// Serde helpers for stored timestamps.
///
/// Files written by older deployments carry offset-less ISO 8601 strings
/// (`2024-06-01T10:00:00.123456`); those are read as UTC. Values are always
/// written back as RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        raw.parse::<DateTime<Utc>>()
            .ok()
            .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|n| n.and_utc()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw))),
            None => Ok(None),
        }
    }
}

fn write_atomically<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Serialization {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

    let mut file = fs::File::create(&tmp_path).map_err(|e| io_error(&tmp_path, e))?;
    file.write_all(&bytes).map_err(|e| io_error(&tmp_path, e))?;
    file.sync_all().map_err(|e| io_error(&tmp_path, e))?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error(path, e)
    })
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}
