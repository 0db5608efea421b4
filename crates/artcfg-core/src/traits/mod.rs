//! Core trait definitions
//!
//! - [`ResourceHandler`]: CRUD adapter for one Artifactory configuration entity
//! - [`StateStore`]: persistent record of what was last applied

pub mod handler;
pub mod state_store;

pub use handler::{ObservedState, ResourceHandler, ResourceHandlerFactory};
pub use state_store::{StateRecord, StateStore, StateStoreFactory};
