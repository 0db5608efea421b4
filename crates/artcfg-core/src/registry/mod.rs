//! Plugin-based handler registry
//!
//! The registry allows resource handlers and state stores to be registered
//! dynamically at runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use artcfg_core::registry::HandlerRegistry;
//!
//! // Create a registry
//! let registry = HandlerRegistry::new();
//!
//! // Register handler factories (normally done by artcfg-resources)
//! registry.register_handler("backup", Box::new(backup_factory));
//!
//! // Create a handler bound to an endpoint
//! let handler = registry.create_handler("backup", &endpoint)?;
//! ```

use crate::config::EndpointConfig;
use crate::error::{Error, Result};
use crate::traits::{ResourceHandler, ResourceHandlerFactory, StateStore, StateStoreFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for plugin-based handler and state store creation
///
/// The registry maintains a map of resource type names to factory objects,
/// allowing dynamic instantiation based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Registered resource handler factories, by resource type name
    handlers: RwLock<HashMap<String, Box<dyn ResourceHandlerFactory>>>,

    /// Registered state store factories
    state_stores: RwLock<HashMap<String, std::sync::Arc<dyn StateStoreFactory>>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler factory
    ///
    /// # Parameters
    ///
    /// - `name`: Resource type name (e.g., "backup", "proxy")
    /// - `factory`: Factory object for creating handler instances
    pub fn register_handler(
        &self,
        name: impl Into<String>,
        factory: Box<dyn ResourceHandlerFactory>,
    ) {
        let name = name.into();
        let mut handlers = self.handlers.write().unwrap();
        handlers.insert(name, factory);
    }

    /// Register a state store factory
    ///
    /// # Parameters
    ///
    /// - `name`: State store type name (e.g., "file", "memory")
    /// - `factory`: Factory object for creating state store instances
    pub fn register_state_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn StateStoreFactory>,
    ) {
        let name = name.into();
        let mut stores = self.state_stores.write().unwrap();
        stores.insert(name, std::sync::Arc::from(factory));
    }

    /// Create a resource handler for the given type, bound to an endpoint
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ResourceHandler>)`: Created handler instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_handler(
        &self,
        resource_type: &str,
        endpoint: &EndpointConfig,
    ) -> Result<Box<dyn ResourceHandler>> {
        let handlers = self.handlers.read().unwrap();

        let factory = handlers.get(resource_type).ok_or_else(|| {
            Error::config(format!("Unknown resource type: {}", resource_type))
        })?;

        factory.create(endpoint)
    }

    /// Create handlers for every registered resource type
    ///
    /// Used by the daemon to hand the full handler set to the engine.
    pub fn create_all_handlers(
        &self,
        endpoint: &EndpointConfig,
    ) -> Result<HashMap<String, Box<dyn ResourceHandler>>> {
        let handlers = self.handlers.read().unwrap();
        let mut created = HashMap::new();
        for (name, factory) in handlers.iter() {
            created.insert(name.clone(), factory.create(endpoint)?);
        }
        Ok(created)
    }

    /// Create a state store from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn StateStore>)`: Created state store instance
    /// - `Err(Error)`: If the store type is not registered or creation fails
    pub async fn create_state_store(
        &self,
        config: &crate::config::StateStoreConfig,
    ) -> Result<Box<dyn StateStore>> {
        let store_type = match config {
            crate::config::StateStoreConfig::File { .. } => "file",
            crate::config::StateStoreConfig::Memory => "memory",
            crate::config::StateStoreConfig::Custom { factory, .. } => factory,
        };

        let stores = self.state_stores.read().unwrap();

        let factory = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown state store type: {}", store_type)))?
            .clone();

        let config_json = serde_json::to_value(config)?;

        // Release the lock before calling async create
        drop(stores);

        factory.create(&config_json).await
    }

    /// List all registered resource type names
    pub fn list_handlers(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap();
        handlers.keys().cloned().collect()
    }

    /// List all registered state store types
    pub fn list_state_stores(&self) -> Vec<String> {
        let stores = self.state_stores.read().unwrap();
        stores.keys().cloned().collect()
    }

    /// Check if a resource type is registered
    pub fn has_handler(&self, name: &str) -> bool {
        let handlers = self.handlers.read().unwrap();
        handlers.contains_key(name)
    }

    /// Check if a state store type is registered
    pub fn has_state_store(&self, name: &str) -> bool {
        let stores = self.state_stores.read().unwrap();
        stores.contains_key(name)
    }
}
