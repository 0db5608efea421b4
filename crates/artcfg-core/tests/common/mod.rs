//! Test doubles and common utilities for engine contract tests
//!
//! The mock handler keeps a fake "remote instance" in memory and counts
//! every CRUD call, so tests can assert not just outcomes but how many
//! API calls the engine issued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use artcfg_core::config::{
    AuthConfig, EndpointConfig, EngineConfig, ReconcileConfig, StateStoreConfig,
};
use artcfg_core::spec::{BackupSpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler};
use artcfg_core::{Error, MemoryStateStore};

/// Shared state of a mock handler, inspectable after the handler is boxed
pub struct MockHandlerState {
    /// Fake remote instance: observed attributes by key
    pub remote: Mutex<HashMap<String, serde_json::Value>>,
    pub create_calls: AtomicUsize,
    pub read_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl MockHandlerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            remote: Mutex::new(HashMap::new()),
            create_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        })
    }

    /// Total number of write calls (create + update + delete)
    pub fn write_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
            + self.update_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
    }

    /// Simulate an out-of-band deletion on the remote instance
    pub fn remove_remote(&self, key: &str) {
        self.remote.lock().unwrap().remove(key);
    }

    /// Simulate an out-of-band modification on the remote instance
    pub fn tamper_remote(&self, key: &str, field: &str, value: serde_json::Value) {
        let mut remote = self.remote.lock().unwrap();
        if let Some(attributes) = remote.get_mut(key)
            && let Some(object) = attributes.as_object_mut()
        {
            object.insert(field.to_string(), value);
        }
    }
}

/// A mock resource handler operating on an in-memory fake remote
pub struct MockResourceHandler {
    resource_type: &'static str,
    state: Arc<MockHandlerState>,
}

impl MockResourceHandler {
    pub fn new(resource_type: &'static str, state: Arc<MockHandlerState>) -> Self {
        Self {
            resource_type,
            state,
        }
    }
}

#[async_trait]
impl ResourceHandler for MockResourceHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState, Error> {
        self.state.create_calls.fetch_add(1, Ordering::SeqCst);
        let attributes = self.desired_payload(spec)?;
        self.state
            .remote
            .lock()
            .unwrap()
            .insert(spec.key().to_string(), attributes.clone());
        Ok(ObservedState {
            key: spec.key().to_string(),
            attributes,
        })
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>, Error> {
        self.state.read_calls.fetch_add(1, Ordering::SeqCst);
        let remote = self.state.remote.lock().unwrap();
        Ok(remote.get(key).map(|attributes| ObservedState {
            key: key.to_string(),
            attributes: attributes.clone(),
        }))
    }

    async fn update(&self, key: &str, spec: &ResourceSpec) -> Result<ObservedState, Error> {
        self.state.update_calls.fetch_add(1, Ordering::SeqCst);
        let attributes = self.desired_payload(spec)?;
        self.state
            .remote
            .lock()
            .unwrap()
            .insert(key.to_string(), attributes.clone());
        Ok(ObservedState {
            key: key.to_string(),
            attributes,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.state.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.state.remote.lock().unwrap().remove(key);
        Ok(())
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(spec)?)
    }

    fn resource_type(&self) -> &'static str {
        self.resource_type
    }
}

/// A declared backup resource for tests
pub fn backup_spec(key: &str) -> ResourceSpec {
    ResourceSpec::Backup(BackupSpec::new(key, "0 0 2 * * ?"))
}

/// Build a reconcile configuration around the given resources
pub fn reconcile_config(resources: Vec<ResourceSpec>, dry_run: bool) -> ReconcileConfig {
    reconcile_config_with_capacity(resources, dry_run, 100)
}

/// Build a reconcile configuration with an explicit event channel capacity
pub fn reconcile_config_with_capacity(
    resources: Vec<ResourceSpec>,
    dry_run: bool,
    event_channel_capacity: usize,
) -> ReconcileConfig {
    ReconcileConfig {
        endpoint: EndpointConfig {
            base_url: "https://artifactory.example.com".to_string(),
            auth: AuthConfig::AccessToken {
                token: "test-token".to_string(),
            },
            http_timeout_secs: 30,
        },
        state_store: StateStoreConfig::Memory,
        resources,
        engine: EngineConfig {
            dry_run,
            event_channel_capacity,
            metadata: HashMap::new(),
        },
    }
}

/// Build a handler map with a single mock backup handler
pub fn backup_handlers(
    state: Arc<MockHandlerState>,
) -> HashMap<String, Box<dyn ResourceHandler>> {
    let mut handlers: HashMap<String, Box<dyn ResourceHandler>> = HashMap::new();
    handlers.insert(
        "backup".to_string(),
        Box::new(MockResourceHandler::new("backup", state)),
    );
    handlers
}

/// A memory state store plus a handle for inspecting it after boxing
pub fn shared_memory_store() -> (Box<MemoryStateStore>, MemoryStateStore) {
    let store = MemoryStateStore::new();
    (Box::new(store.clone()), store)
}
