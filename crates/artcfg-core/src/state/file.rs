// # File State Store
//
// JSON-file implementation of StateStore. Persists the last applied payload
// per resource address across runs; prune depends on these records surviving
// restarts.
//
// Durability model:
// - every write lands in a temp file first and is renamed into place
// - the previous good file is kept as `<path>.backup` before the rename
// - a file that fails to parse on load is replaced from the backup; if the
//   backup is also unreadable the store starts empty
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "records": {
//     "backup:nightly": {
//       "resource_type": "backup",
//       "key": "nightly",
//       "payload": { "cronExp": "0 0 2 * * ?" },
//       "applied_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};

// Bumped if the on-disk layout ever changes
const STATE_FILE_VERSION: &str = "1.0";

/// Serializable on-disk layout
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct StateFile {
    version: String,
    records: HashMap<String, StateRecord>,
}

/// Outcome of reading one candidate state file
enum Loaded {
    Records(HashMap<String, StateRecord>),
    Missing,
    Corrupt(String),
}

/// File-based state store with atomic writes and backup recovery
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    records: Arc<RwLock<HashMap<String, StateRecord>>>,
    dirty: Arc<RwLock<bool>>,
}

impl FileStateStore {
    /// Open the store at `path`, creating parent directories as needed
    ///
    /// A corrupt state file is recovered from its backup; a corrupt backup
    /// means starting over with an empty record set.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }

        let records = match Self::read_file(&path).await {
            Loaded::Records(records) => {
                tracing::debug!("Loaded {} state record(s) from {}", records.len(), path.display());
                records
            }
            Loaded::Missing => HashMap::new(),
            Loaded::Corrupt(reason) => Self::recover(&path, &reason).await,
        };

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
            dirty: Arc::new(RwLock::new(false)),
        })
    }

    /// Attempt recovery from the backup file after a corrupt load
    async fn recover(path: &Path, reason: &str) -> HashMap<String, StateRecord> {
        tracing::warn!(
            "State file {} is unreadable ({}), trying backup",
            path.display(),
            reason
        );

        let backup = Self::backup_path(path);
        match Self::read_file(&backup).await {
            Loaded::Records(records) => {
                tracing::info!("Recovered {} record(s) from {}", records.len(), backup.display());
                // Put the good copy back in place for the next load
                if let Err(e) = fs::copy(&backup, path).await {
                    tracing::error!("Could not restore state file from backup: {}", e);
                }
                records
            }
            Loaded::Missing => {
                tracing::warn!("No backup at {}, starting with empty state", backup.display());
                HashMap::new()
            }
            Loaded::Corrupt(backup_reason) => {
                tracing::error!(
                    "Backup is also unreadable ({}), starting with empty state",
                    backup_reason
                );
                HashMap::new()
            }
        }
    }

    /// Read and parse one candidate file without failing the caller
    async fn read_file(path: &Path) -> Loaded {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Loaded::Missing,
            Err(e) => return Loaded::Corrupt(e.to_string()),
        };

        match serde_json::from_str::<StateFile>(&content) {
            Ok(file) => {
                if file.version != STATE_FILE_VERSION {
                    tracing::warn!(
                        "State file version is {} (expected {}), loading anyway",
                        file.version,
                        STATE_FILE_VERSION
                    );
                }
                Loaded::Records(file.records)
            }
            Err(e) => Loaded::Corrupt(e.to_string()),
        }
    }

    /// Persist the current records: temp write, backup the old file, rename
    async fn persist(&self) -> Result<(), Error> {
        let snapshot = {
            let records = self.records.read().await;
            StateFile {
                version: STATE_FILE_VERSION.to_string(),
                records: records.clone(),
            }
        };

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::state_store(format!("State serialization failed: {}", e)))?;

        let temp = self.path.with_extension("tmp");
        fs::write(&temp, json.as_bytes()).await.map_err(|e| {
            Error::state_store(format!("Writing {} failed: {}", temp.display(), e))
        })?;

        // Keep the last good file around for recovery
        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("State backup failed: {}", e);
        }

        fs::rename(&temp, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Replacing {} failed: {}",
                self.path.display(),
                e
            ))
        })?;

        *self.dirty.write().await = false;
        tracing::trace!("State persisted to {}", self.path.display());
        Ok(())
    }

    fn backup_path(path: &Path) -> PathBuf {
        path.with_extension("backup")
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_record(&self, address: &str) -> Result<Option<StateRecord>, Error> {
        Ok(self.records.read().await.get(address).cloned())
    }

    async fn set_record(&self, address: &str, record: &StateRecord) -> Result<(), Error> {
        {
            let mut records = self.records.write().await;
            records.insert(address.to_string(), record.clone());
            *self.dirty.write().await = true;
        }
        // Written through immediately; flush() only covers buffered stores
        self.persist().await
    }

    async fn delete_record(&self, address: &str) -> Result<(), Error> {
        {
            let mut records = self.records.write().await;
            records.remove(address);
            *self.dirty.write().await = true;
        }
        self.persist().await
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        Ok(self.records.read().await.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        if *self.dirty.read().await {
            self.persist().await
        } else {
            Ok(())
        }
    }
}

/// Factory for creating file state stores
pub struct FileStateStoreFactory;

#[async_trait]
impl StateStoreFactory for FileStateStoreFactory {
    async fn create(&self, config: &serde_json::Value) -> Result<Box<dyn StateStore>, Error> {
        let path = config
            .get("path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| Error::config("File state store requires a 'path'"))?;
        Ok(Box::new(FileStateStore::new(path).await?))
    }
}
