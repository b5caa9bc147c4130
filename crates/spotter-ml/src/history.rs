//! Append-only action-path history.
//!
//! The store is a single JSON document, `{"data": [...]}`, rewritten in full
//! on every append. It is created with an empty `data` list on first use.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// System uptime in seconds.
    pub uptime: u64,
    /// Recently active window titles, oldest first.
    pub active_windows_history: Vec<String>,
    /// The action path reported by the host.
    pub action_path: String,
}

/// The whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryDocument {
    pub data: Vec<HistoryRecord>,
}

/// JSON file holding every recorded action.
pub struct HistoryStore {
    path: PathBuf,
    // Serializes file access, including creation on first load
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the store, creating it if it does not exist yet.
    pub fn load(&self) -> Result<HistoryDocument, HistoryError> {
        let _guard = self.write_lock.lock();
        self.load_locked()
    }

    /// Append a record. Returns the number of records now stored.
    pub fn append(&self, record: HistoryRecord) -> Result<usize, HistoryError> {
        let _guard = self.write_lock.lock();
        let mut document = self.load_locked()?;
        document.data.push(record);
        self.write(&document)?;
        Ok(document.data.len())
    }

    // Caller holds `write_lock`
    fn load_locked(&self) -> Result<HistoryDocument, HistoryError> {
        if !self.path.exists() {
            let document = HistoryDocument::default();
            self.write(&document)?;
            tracing::info!("Created history store at {}", self.path.display());
            return Ok(document);
        }

        let raw = fs::read(&self.path).map_err(|source| self.io_error(source))?;
        serde_json::from_slice(&raw).map_err(|source| HistoryError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, document: &HistoryDocument) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let bytes = serde_json::to_vec(document)?;
        fs::write(&self.path, bytes).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
