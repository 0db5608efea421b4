// # artcfgd - Artifactory Configuration Reconciler
//
// This binary is a THIN integration layer:
// 1. Reading configuration from environment variables
// 2. Loading the declared resources file
// 3. Registering handlers and state stores
// 4. Running the reconcile engine in the requested mode
//
// All reconcile logic lives in artcfg-core; all API knowledge lives in
// artcfg-client and artcfg-resources. Do not add either here.
//
// ## Usage
//
// ```bash
// artcfgd [plan|apply|destroy]
// ```
//
// - `plan` (default): read remote state and report what apply would do (no writes)
// - `apply`: converge the instance onto the declared resources
// - `destroy`: delete every declared resource from the instance
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Endpoint
// - `ARTCFG_BASE_URL`: Base URL of the Artifactory instance (required)
// - `ARTCFG_HTTP_TIMEOUT_SECS`: Request timeout in seconds (10-300, default 30)
//
// ### Authentication (exactly one mode)
// - `ARTCFG_ACCESS_TOKEN`: Bearer access token
// - `ARTCFG_API_KEY`: Legacy API key
// - `ARTCFG_USERNAME` + `ARTCFG_PASSWORD`: Basic authentication
//
// ### Resources
// - `ARTCFG_RESOURCES_FILE`: Path to the YAML file of declared resources (required)
//
// ### State Store
// - `ARTCFG_STATE_STORE_TYPE`: Type of state store (file, memory; default file)
// - `ARTCFG_STATE_STORE_PATH`: Path to state file (for file store)
//
// ### Engine
// - `ARTCFG_DRY_RUN`: Set to "true" to log writes instead of issuing them
// - `ARTCFG_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export ARTCFG_BASE_URL=https://artifactory.example.com
// export ARTCFG_ACCESS_TOKEN=your_token
// export ARTCFG_RESOURCES_FILE=/etc/artcfg/resources.yaml
// export ARTCFG_STATE_STORE_TYPE=file
// export ARTCFG_STATE_STORE_PATH=/var/lib/artcfg/state.json
//
// artcfgd apply
// ```

use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use artcfg_core::config::{
    AuthConfig, EndpointConfig, EngineConfig, ReconcileConfig, StateStoreConfig,
};
use artcfg_core::state::{FileStateStoreFactory, MemoryStateStoreFactory};
use artcfg_core::{HandlerRegistry, ReconcileEvent, Reconciler, ResourceSpec};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean run
/// - 1: Configuration or startup error
/// - 2: Runtime error (failed resources, transport failures)
#[derive(Debug, Clone, Copy)]
enum ArtcfgExitCode {
    /// Clean run (normal exit)
    CleanRun = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ArtcfgExitCode> for ExitCode {
    fn from(code: ArtcfgExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// The requested run mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plan,
    Apply,
    Destroy,
}

/// Application configuration
struct Config {
    mode: Mode,
    base_url: String,
    access_token: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    resources_file: String,
    state_store_type: String,
    state_store_path: Option<String>,
    http_timeout_secs: Option<u64>,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from the command line and environment variables
    fn from_env() -> Result<Self> {
        let mode = match env::args().nth(1).as_deref() {
            Some("plan") => Mode::Plan,
            Some("apply") => Mode::Apply,
            Some("destroy") => Mode::Destroy,
            Some(other) => anyhow::bail!(
                "Unknown mode '{}'. Usage: artcfgd [plan|apply|destroy]",
                other
            ),
            // No writes without an explicit request
            None => Mode::Plan,
        };

        Ok(Self {
            mode,
            base_url: env::var("ARTCFG_BASE_URL").unwrap_or_default(),
            access_token: env::var("ARTCFG_ACCESS_TOKEN").ok(),
            api_key: env::var("ARTCFG_API_KEY").ok(),
            username: env::var("ARTCFG_USERNAME").ok(),
            password: env::var("ARTCFG_PASSWORD").ok(),
            resources_file: env::var("ARTCFG_RESOURCES_FILE").unwrap_or_default(),
            state_store_type: env::var("ARTCFG_STATE_STORE_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            state_store_path: env::var("ARTCFG_STATE_STORE_PATH").ok(),
            http_timeout_secs: env::var("ARTCFG_HTTP_TIMEOUT_SECS")
                .ok()
                .map(|raw| parse_timeout_secs(&raw))
                .transpose()?,
            dry_run: env::var("ARTCFG_DRY_RUN")
                .map(|s| s.eq_ignore_ascii_case("true") || s == "1")
                .unwrap_or(false),
            log_level: env::var("ARTCFG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs comprehensive validation including:
    /// - Required field presence
    /// - URL scheme validation
    /// - Exactly-one authentication mode
    /// - Numeric range validation
    /// - Security checks (placeholder credentials)
    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!(
                "ARTCFG_BASE_URL is required. \
                Set it via: export ARTCFG_BASE_URL=https://artifactory.example.com"
            );
        }

        if !self.base_url.starts_with("https://") && !self.base_url.starts_with("http://") {
            anyhow::bail!(
                "ARTCFG_BASE_URL must use HTTP or HTTPS scheme. Got: {}",
                self.base_url
            );
        }

        if self.base_url.starts_with("http://") {
            eprintln!(
                "WARNING: ARTCFG_BASE_URL uses HTTP (not HTTPS). \
                      Credentials will travel unencrypted."
            );
        }

        // Exactly one authentication mode
        let basic_pair = self.username.is_some() && self.password.is_some();
        let modes = [self.access_token.is_some(), self.api_key.is_some(), basic_pair]
            .iter()
            .filter(|m| **m)
            .count();
        match modes {
            0 => anyhow::bail!(
                "No authentication configured. Set exactly one of: \
                ARTCFG_ACCESS_TOKEN, ARTCFG_API_KEY, or ARTCFG_USERNAME + ARTCFG_PASSWORD"
            ),
            1 => {}
            _ => anyhow::bail!(
                "Multiple authentication modes configured. Set exactly one of: \
                ARTCFG_ACCESS_TOKEN, ARTCFG_API_KEY, or ARTCFG_USERNAME + ARTCFG_PASSWORD"
            ),
        }

        if (self.username.is_some()) != (self.password.is_some()) {
            anyhow::bail!("ARTCFG_USERNAME and ARTCFG_PASSWORD must be set together");
        }

        // Check for obvious placeholder credentials (common mistake)
        if let Some(token) = &self.access_token {
            let token_lower = token.to_lowercase();
            if token_lower.contains("your_token")
                || token_lower.contains("replace_me")
                || token_lower.contains("example")
                || token_lower == "token"
            {
                anyhow::bail!(
                    "ARTCFG_ACCESS_TOKEN appears to be a placeholder. \
                    Use an actual access token from your Artifactory instance."
                );
            }
        }

        if self.resources_file.is_empty() {
            anyhow::bail!(
                "ARTCFG_RESOURCES_FILE is required. \
                Set it via: export ARTCFG_RESOURCES_FILE=/etc/artcfg/resources.yaml"
            );
        }

        if !std::path::Path::new(&self.resources_file).exists() {
            anyhow::bail!(
                "ARTCFG_RESOURCES_FILE does not exist: {}",
                self.resources_file
            );
        }

        // Validate state store type
        match self.state_store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "ARTCFG_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.state_store_type
            ),
        }

        // Validate state store path for file store
        if self.state_store_type == "file" {
            if let Some(ref path) = self.state_store_path {
                if path.is_empty() {
                    anyhow::bail!(
                        "ARTCFG_STATE_STORE_PATH cannot be empty when ARTCFG_STATE_STORE_TYPE=file"
                    );
                }

                // Check parent directory exists
                if let Some(parent) = std::path::Path::new(path).parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    anyhow::bail!(
                        "ARTCFG_STATE_STORE_PATH parent directory does not exist: {}. \
                            Create it first: sudo mkdir -p {}",
                        parent.display(),
                        parent.display()
                    );
                }
            } else {
                anyhow::bail!(
                    "ARTCFG_STATE_STORE_PATH is required when ARTCFG_STATE_STORE_TYPE=file. \
                    Set it via: export ARTCFG_STATE_STORE_PATH=/var/lib/artcfg/state.json"
                );
            }
        }

        // Validate numeric ranges
        if let Some(timeout) = self.http_timeout_secs
            && !(10..=300).contains(&timeout)
        {
            anyhow::bail!(
                "ARTCFG_HTTP_TIMEOUT_SECS must be between 10 and 300 seconds. Got: {}",
                timeout
            );
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ARTCFG_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the endpoint configuration
    fn endpoint(&self) -> EndpointConfig {
        let auth = if let Some(token) = &self.access_token {
            AuthConfig::AccessToken {
                token: token.clone(),
            }
        } else if let Some(key) = &self.api_key {
            AuthConfig::ApiKey { key: key.clone() }
        } else {
            AuthConfig::Basic {
                username: self.username.clone().unwrap_or_default(),
                password: self.password.clone().unwrap_or_default(),
            }
        };

        EndpointConfig {
            base_url: self.base_url.clone(),
            auth,
            http_timeout_secs: self.http_timeout_secs.unwrap_or(30),
        }
    }

    /// Build the state store configuration
    fn state_store(&self) -> StateStoreConfig {
        match self.state_store_type.as_str() {
            "memory" => StateStoreConfig::Memory,
            _ => StateStoreConfig::File {
                path: self.state_store_path.clone().unwrap_or_default(),
            },
        }
    }
}

fn main() -> ExitCode {
    // Load configuration from arguments and environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ArtcfgExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ArtcfgExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ArtcfgExitCode::ConfigError.into();
    }

    info!("Starting artcfgd ({:?} mode)", config.mode);

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ArtcfgExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run(config).await {
            error!("Run error: {}", e);
            ArtcfgExitCode::RuntimeError
        } else {
            ArtcfgExitCode::CleanRun
        }
    });

    result.into()
}

/// Parse `ARTCFG_HTTP_TIMEOUT_SECS`, rejecting anything non-numeric
///
/// Range checking (10-300) happens in [`Config::validate`]; a value that
/// does not even parse is a configuration error, not a reason to fall back
/// to the default.
fn parse_timeout_secs(raw: &str) -> Result<u64> {
    raw.parse().map_err(|_| {
        anyhow::anyhow!(
            "ARTCFG_HTTP_TIMEOUT_SECS must be an integer number of seconds. Got: {}",
            raw
        )
    })
}

/// Load the declared resources from the YAML file
fn load_resources(path: &str) -> Result<Vec<ResourceSpec>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path, e))?;
    let resources: Vec<ResourceSpec> = serde_yaml_ng::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
    Ok(resources)
}

/// Run the reconciler in the requested mode
async fn run(config: Config) -> Result<()> {
    // Create the registry and register built-in handlers and state stores
    let registry = HandlerRegistry::new();
    artcfg_resources::register(&registry);
    registry.register_state_store("file", Box::new(FileStateStoreFactory));
    registry.register_state_store("memory", Box::new(MemoryStateStoreFactory));

    let resources = load_resources(&config.resources_file)?;
    info!(
        "Loaded {} declared resource(s) from {}",
        resources.len(),
        config.resources_file
    );

    let endpoint = config.endpoint();
    let handlers = registry.create_all_handlers(&endpoint)?;
    let state_store = registry.create_state_store(&config.state_store()).await?;

    let reconcile_config = ReconcileConfig {
        endpoint,
        state_store: config.state_store(),
        resources,
        engine: EngineConfig {
            dry_run: config.dry_run,
            ..EngineConfig::default()
        },
    };

    let (reconciler, mut events) = Reconciler::new(handlers, state_store, reconcile_config)?;

    // Consume reconcile events in the background
    let event_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ReconcileEvent::Started { resource_count } => {
                    info!("Reconciling {} resource(s)", resource_count);
                }
                ReconcileEvent::PlanComputed {
                    creates,
                    updates,
                    deletes,
                    unchanged,
                } => {
                    info!(
                        "Plan: {} to create, {} to update, {} to delete, {} unchanged",
                        creates, updates, deletes, unchanged
                    );
                }
                ReconcileEvent::DriftDetected { address } => {
                    warn!("Drift detected: {}", address);
                }
                ReconcileEvent::ActionSucceeded { address, action } => {
                    info!("{} {}: ok", action, address);
                }
                ReconcileEvent::ActionFailed { address, error } => {
                    error!("{}: {}", address, error);
                }
                ReconcileEvent::Stopped { reason } => {
                    info!("{}", reason);
                }
            }
        }
    });

    let outcome = match config.mode {
        Mode::Plan => {
            let plan = reconciler.plan().await?;
            if plan.has_changes() {
                info!("Plan contains changes; run 'artcfgd apply' to converge");
            } else {
                info!("Remote state matches the declaration; nothing to do");
            }
            Ok(())
        }
        Mode::Apply => {
            let summary = reconciler.apply().await?;
            info!(
                "Apply finished: {} created, {} updated, {} deleted, {} unchanged, {} failed",
                summary.created,
                summary.updated,
                summary.deleted,
                summary.unchanged,
                summary.failed
            );
            if summary.failed > 0 {
                anyhow::bail!("{} resource(s) failed to apply", summary.failed)
            } else {
                Ok(())
            }
        }
        Mode::Destroy => {
            let summary = reconciler.destroy().await?;
            info!(
                "Destroy finished: {} deleted, {} failed",
                summary.deleted, summary.failed
            );
            if summary.failed > 0 {
                anyhow::bail!("{} resource(s) failed to delete", summary.failed)
            } else {
                Ok(())
            }
        }
    };

    // The reconciler (and its event sender) is dropped here, closing the channel
    drop(reconciler);
    let _ = event_task.await;

    outcome
}
