//! Configuration types for the artcfg system
//!
//! This module defines the endpoint, state store, and engine configuration
//! structures. The declared resources themselves live in [`crate::spec`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::spec::ResourceSpec;

/// Main reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Artifactory endpoint configuration
    pub endpoint: EndpointConfig,

    /// State store configuration
    pub state_store: StateStoreConfig,

    /// Declared configuration resources
    pub resources: Vec<ResourceSpec>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl ReconcileConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            state_store: StateStoreConfig::default(),
            resources: Vec::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    ///
    /// Checks the endpoint, every declared resource, and rejects duplicate
    /// resource addresses (two declarations of the same `type:key`).
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.endpoint.validate()?;

        let mut seen = std::collections::HashSet::new();
        for spec in &self.resources {
            spec.validate()?;
            let address = format!("{}:{}", spec.type_name(), spec.key());
            if !seen.insert(address.clone()) {
                return Err(crate::Error::config(format!(
                    "Duplicate resource declaration: {}",
                    address
                )));
            }
        }

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Event channel capacity must be > 0",
            ));
        }

        Ok(())
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Artifactory endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the Artifactory instance (e.g., "https://artifactory.example.com")
    pub base_url: String,

    /// Authentication credentials
    pub auth: AuthConfig,

    /// HTTP request timeout in seconds
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl EndpointConfig {
    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.base_url.is_empty() {
            return Err(crate::Error::config("Artifactory base URL cannot be empty"));
        }
        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Artifactory base URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(crate::Error::config("HTTP timeout must be > 0"));
        }
        self.auth.validate()
    }

    /// Base URL with any trailing slash removed
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth: AuthConfig::default(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Authentication configuration for the Artifactory API
///
/// `Debug` is hand-written so credentials never reach log output; anything
/// holding an `AuthConfig` can be formatted with `{:?}` safely.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Bearer access token (Authorization: Bearer <token>)
    AccessToken {
        /// The access token
        token: String,
    },

    /// Legacy API key (X-JFrog-Art-Api header)
    ApiKey {
        /// The API key
        key: String,
    },

    /// HTTP basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: String,
    },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthConfig::AccessToken { .. } => f
                .debug_struct("AccessToken")
                .field("token", &"<REDACTED>")
                .finish(),
            AuthConfig::ApiKey { .. } => {
                f.debug_struct("ApiKey").field("key", &"<REDACTED>").finish()
            }
            AuthConfig::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<REDACTED>")
                .finish(),
        }
    }
}

impl AuthConfig {
    /// Validate the authentication configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            AuthConfig::AccessToken { token } => {
                if token.is_empty() {
                    return Err(crate::Error::config("Access token cannot be empty"));
                }
                Ok(())
            }
            AuthConfig::ApiKey { key } => {
                if key.is_empty() {
                    return Err(crate::Error::config("API key cannot be empty"));
                }
                Ok(())
            }
            AuthConfig::Basic { username, password } => {
                if username.is_empty() {
                    return Err(crate::Error::config("Username cannot be empty"));
                }
                if password.is_empty() {
                    return Err(crate::Error::config("Password cannot be empty"));
                }
                Ok(())
            }
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig::AccessToken {
            token: String::new(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based state store
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory state store (not persistent)
    #[default]
    Memory,

    /// Custom state store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Dry-run mode: compute the plan, perform reads, but never write
    #[serde(default)]
    pub dry_run: bool,

    /// Capacity of the internal event channel
    ///
    /// When full, new reconcile events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Additional metadata to attach to operations
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            event_channel_capacity: default_event_channel_capacity(),
            metadata: HashMap::new(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_http_timeout_secs() -> u64 {
    30
}
