// # Resource Handler Trait
//
// Defines the interface for the CRUD adapters that map declared resources
// onto Artifactory's REST and YAML system-configuration APIs.
//
// ## Implementations
//
// - `artcfg-resources` crate: backup, proxy, property_set, ldap_setting,
//   ldap_group_setting, mail_server, package_cleanup_policy
//
// Handlers are single-shot pass-throughs: one declared resource in, one or
// two HTTP calls out. All sequencing, drift comparison, and state persistence
// is owned by the `Reconciler`; handlers must not retry, cache, or spawn
// tasks. The only retry in the system lives in the shared HTTP client (a
// single retry on a 409 merge conflict during the YAML configuration PATCH).

use async_trait::async_trait;

use crate::config::EndpointConfig;
use crate::spec::ResourceSpec;

/// The remote state of a resource, as observed through the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedState {
    /// The key of the observed object
    pub key: String,

    /// The observed attributes, normalized to JSON
    ///
    /// May contain server-computed fields that were never declared; drift
    /// comparison treats the desired payload as a subset of this value.
    pub attributes: serde_json::Value,
}

/// Trait for resource handler implementations
///
/// One handler exists per resource type. Handlers convert a declared spec
/// into the API payload, issue the HTTP call, and normalize the response.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Error Semantics
///
/// - `read` maps a 404 (or an absent YAML block) to `Ok(None)`; the engine
///   treats that as "resource no longer exists" and drops it from state.
/// - Every other non-success response surfaces as an error; the engine
///   reports it and continues with the remaining resources.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Create the resource on the remote instance
    ///
    /// Returns the observed state after creation.
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState, crate::Error>;

    /// Read the current remote state of the resource
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ObservedState))`: The resource exists remotely
    /// - `Ok(None)`: The resource does not exist (404 / absent block)
    /// - `Err(Error)`: The request failed
    async fn read(&self, key: &str) -> Result<Option<ObservedState>, crate::Error>;

    /// Update the resource to match the declared spec
    ///
    /// # Idempotency
    ///
    /// Updates must be idempotent: applying the same spec twice is safe and
    /// results in no change after the first successful call.
    async fn update(&self, key: &str, spec: &ResourceSpec)
    -> Result<ObservedState, crate::Error>;

    /// Delete the resource from the remote instance
    ///
    /// Deleting a resource that is already gone is not an error.
    async fn delete(&self, key: &str) -> Result<(), crate::Error>;

    /// The API payload this handler would send for the given spec
    ///
    /// Used by the engine for drift comparison against the observed state.
    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value, crate::Error>;

    /// Fields excluded from drift comparison
    ///
    /// Write-only fields (passwords) are accepted by the server but never
    /// echoed back, so comparing them would report permanent drift.
    fn write_only_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// The resource type name this handler serves (for registry lookup and logging)
    fn resource_type(&self) -> &'static str;
}

/// Helper trait for constructing resource handlers from configuration
pub trait ResourceHandlerFactory: Send + Sync {
    /// Create a ResourceHandler bound to the given Artifactory endpoint
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>, crate::Error>;
}
