// # State Store Trait
//
// Defines the interface for persistent state management.
//
// ## Purpose
//
// The state store tracks the last applied payload for each resource address
// (`type:key`). This is what makes prune possible (deleting remote objects
// that are no longer declared) and what lets a 404 on read be reported as
// "resource no longer exists" rather than an error.
//
// ## Implementations
//
// - File-based: JSON file with atomic writes and backup recovery
// - Memory: non-persistent, for tests and ad-hoc runs

use async_trait::async_trait;

/// State record for one managed resource
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StateRecord {
    /// Resource type name
    pub resource_type: String,

    /// Resource key within its type
    pub key: String,

    /// The API payload last applied to the remote instance
    pub payload: serde_json::Value,

    /// Timestamp of the last successful apply
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

impl StateRecord {
    /// Create a new state record stamped with the current time
    pub fn new(
        resource_type: impl Into<String>,
        key: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            key: key.into(),
            payload,
            applied_at: chrono::Utc::now(),
        }
    }

    /// The address of this record (`type:key`)
    pub fn address(&self) -> String {
        format!("{}:{}", self.resource_type, self.key)
    }
}

/// Trait for state store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the state record for a resource address
    ///
    /// # Returns
    ///
    /// - `Ok(Some(StateRecord))`: The record exists
    /// - `Ok(None)`: Nothing recorded for this address
    /// - `Err(Error)`: Storage error
    async fn get_record(&self, address: &str) -> Result<Option<StateRecord>, crate::Error>;

    /// Set the state record for a resource address
    async fn set_record(&self, address: &str, record: &StateRecord) -> Result<(), crate::Error>;

    /// Delete the state record for a resource address
    ///
    /// Deleting a record that does not exist is not an error.
    async fn delete_record(&self, address: &str) -> Result<(), crate::Error>;

    /// List all recorded resource addresses
    async fn list_records(&self) -> Result<Vec<String>, crate::Error>;

    /// Persist any pending changes
    ///
    /// Some implementations may buffer writes. This ensures all changes are
    /// flushed to persistent storage.
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// Helper trait for constructing state stores from configuration
#[async_trait]
pub trait StateStoreFactory: Send + Sync {
    /// Create a StateStore instance from configuration
    async fn create(
        &self,
        config: &serde_json::Value,
    ) -> Result<Box<dyn StateStore>, crate::Error>;
}
