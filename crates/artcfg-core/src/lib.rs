// # artcfg-core
//
// Core library for the declarative Artifactory configuration reconciler.
//
// ## Architecture Overview
//
// This library provides the core functionality for reconciling declared
// Artifactory configuration against a remote instance:
// - **ResourceSpec**: Flat DTOs describing each configuration entity
// - **ResourceHandler**: Trait for the per-resource CRUD adapters
// - **StateStore**: Trait for persistent state management (prune, drift)
// - **Reconciler**: Core engine computing and executing plans
// - **HandlerRegistry**: Plugin-based registry for resource handlers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the HTTP adapters
// 2. **Plugin-Based**: Handlers are registered dynamically, no hard-coded if-else
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Declarative**: The remote server owns validation and persistence; this
//    crate only maps declarations to API payloads and reconciles drift

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod registry;
pub mod spec;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{AuthConfig, EndpointConfig, ReconcileConfig, StateStoreConfig};
pub use engine::{Action, ApplySummary, Plan, ReconcileEvent, Reconciler};
pub use error::{Error, Result};
pub use registry::HandlerRegistry;
pub use spec::ResourceSpec;
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{ObservedState, ResourceHandler, StateRecord, StateStore};
