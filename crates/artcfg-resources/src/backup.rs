//! Scheduled backup handler
//!
//! Backups live in the `backups` block of the system configuration, keyed by
//! backup name. All writes go through the YAML PATCH; removal patches the
//! entry to null.

use async_trait::async_trait;

use artcfg_client::{yaml, ArtifactoryClient};
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{BackupSpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const ROOT: &str = "backups";

/// YAML payload of one backup entry
///
/// The backup key is the map key in the configuration document, not a field
/// of the entry itself.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BackupPayload {
    enabled: bool,
    cron_exp: String,
    retention_period_hours: u32,
    // Absent when empty so drift comparison matches a server that omits it
    #[serde(skip_serializing_if = "Vec::is_empty")]
    excluded_repositories: Vec<String>,
    create_archive: bool,
    exclude_new_repositories: bool,
    send_mail_on_error: bool,
    verify_disk_space: bool,
}

impl From<&BackupSpec> for BackupPayload {
    fn from(spec: &BackupSpec) -> Self {
        Self {
            enabled: spec.enabled,
            cron_exp: spec.cron_exp.clone(),
            retention_period_hours: spec.retention_period_hours,
            excluded_repositories: spec.excluded_repositories.clone(),
            create_archive: spec.create_archive,
            exclude_new_repositories: spec.exclude_new_repositories,
            send_mail_on_error: spec.send_mail_on_error,
            verify_disk_space: spec.verify_disk_space,
        }
    }
}

fn expect_backup(spec: &ResourceSpec) -> Result<&BackupSpec> {
    match spec {
        ResourceSpec::Backup(backup) => Ok(backup),
        other => Err(Error::resource(
            "backup",
            format!("expected a backup spec, got '{}'", other.type_name()),
        )),
    }
}

/// Handler for scheduled backup jobs
pub struct BackupHandler {
    client: ArtifactoryClient,
}

impl BackupHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    /// PATCH the backup block and read back the observed state
    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let backup = expect_backup(spec)?;
        backup.validate()?;

        let body = yaml::keyed_block(ROOT, &backup.key, &BackupPayload::from(backup))?;
        self.client.patch_system_yaml(&body).await?;

        self.read(&backup.key).await?.ok_or_else(|| {
            Error::resource(
                "backup",
                format!("backup '{}' not present after write", backup.key),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for BackupHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>> {
        let document = self.client.get_system_yaml().await?;
        match yaml::lookup(&document, &[ROOT, key]) {
            Some(block) => Ok(Some(ObservedState {
                key: key.to_string(),
                attributes: yaml::yaml_to_json(block)?,
            })),
            None => Ok(None),
        }
    }

    async fn update(&self, _key: &str, spec: &ResourceSpec) -> Result<ObservedState> {
        self.apply(spec).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let body = yaml::keyed_block_reset(ROOT, key)?;
        self.client.patch_system_yaml(&body).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let backup = expect_backup(spec)?;
        Ok(serde_json::to_value(BackupPayload::from(backup))?)
    }

    fn resource_type(&self) -> &'static str {
        "backup"
    }
}

/// Factory for creating BackupHandler instances
pub struct BackupHandlerFactory;

impl ResourceHandlerFactory for BackupHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(BackupHandler::new(endpoint)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artcfg_core::config::AuthConfig;

    fn handler() -> BackupHandler {
        let endpoint = EndpointConfig {
            base_url: "https://artifactory.example.com".to_string(),
            auth: AuthConfig::AccessToken {
                token: "token".to_string(),
            },
            http_timeout_secs: 30,
        };
        BackupHandler::new(&endpoint).unwrap()
    }

    #[test]
    fn test_desired_payload_uses_camel_case() {
        let spec = ResourceSpec::Backup(BackupSpec::new("nightly", "0 0 2 * * ?"));
        let payload = handler().desired_payload(&spec).unwrap();

        assert_eq!(payload["cronExp"], "0 0 2 * * ?");
        assert_eq!(payload["retentionPeriodHours"], 168);
        assert_eq!(payload["sendMailOnError"], true);
        // The key is the map key, never a payload field
        assert!(payload.get("key").is_none());
    }

    #[test]
    fn test_rejects_wrong_spec_variant() {
        let spec = ResourceSpec::MailServer(artcfg_core::spec::MailServerSpec::new(
            "smtp.example.com",
        ));
        assert!(handler().desired_payload(&spec).is_err());
    }

    #[test]
    fn test_patch_body_shape() {
        let spec = BackupSpec::new("weekly", "0 0 4 * * 6");
        let body = yaml::keyed_block(ROOT, &spec.key, &BackupPayload::from(&spec)).unwrap();
        let parsed: serde_yaml_ng::Value = serde_yaml_ng::from_str(&body).unwrap();
        assert!(yaml::lookup(&parsed, &["backups", "weekly"]).is_some());
    }
}
