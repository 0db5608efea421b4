// # Memory State Store
//
// In-memory implementation of StateStore. State is lost when the process
// exits; intended for tests and one-shot plan runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{StateRecord, StateStore, StateStoreFactory};

/// In-memory state store
///
/// Cloning shares the underlying map, so clones observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    records: Arc<RwLock<HashMap<String, StateRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_record(&self, address: &str) -> Result<Option<StateRecord>, Error> {
        let records = self.records.read().await;
        Ok(records.get(address).cloned())
    }

    async fn set_record(&self, address: &str, record: &StateRecord) -> Result<(), Error> {
        let mut records = self.records.write().await;
        records.insert(address.to_string(), record.clone());
        Ok(())
    }

    async fn delete_record(&self, address: &str) -> Result<(), Error> {
        let mut records = self.records.write().await;
        records.remove(address);
        Ok(())
    }

    async fn list_records(&self) -> Result<Vec<String>, Error> {
        let records = self.records.read().await;
        Ok(records.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to persist
        Ok(())
    }
}

/// Factory for creating memory state stores
pub struct MemoryStateStoreFactory;

#[async_trait]
impl StateStoreFactory for MemoryStateStoreFactory {
    async fn create(&self, _config: &serde_json::Value) -> Result<Box<dyn StateStore>, Error> {
        Ok(Box::new(MemoryStateStore::new()))
    }
}
