//! Package cleanup policy handler
//!
//! Unlike the system-configuration blocks, cleanup policies are a plain REST
//! JSON entity: POST creates, PUT updates, DELETE removes. Whether the policy
//! actually runs is a separate enablement sub-resource; reads merge its
//! `enabled` flag into the observed attributes so drift comparison sees one
//! coherent object.

use async_trait::async_trait;

use artcfg_client::ArtifactoryClient;
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{CleanupSearchCriteria, PackageCleanupPolicySpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const POLICIES_PATH: &str = "artifactory/api/cleanup/packages/policies";

/// JSON body of a cleanup policy, without the enablement flag
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CleanupPolicyPayload {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cron_exp: Option<String>,
    duration_in_minutes: u32,
    search_criteria: SearchCriteriaPayload,
    skip_trashcan: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchCriteriaPayload {
    package_types: Vec<String>,
    repos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    excluded_repos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    included_projects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_before_in_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_downloaded_before_in_months: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EnablementPayload {
    enabled: bool,
}

impl From<&CleanupSearchCriteria> for SearchCriteriaPayload {
    fn from(criteria: &CleanupSearchCriteria) -> Self {
        Self {
            package_types: criteria.package_types.clone(),
            repos: criteria.repos.clone(),
            excluded_repos: criteria.excluded_repos.clone(),
            included_projects: criteria.included_projects.clone(),
            created_before_in_months: criteria.created_before_in_months,
            last_downloaded_before_in_months: criteria.last_downloaded_before_in_months,
        }
    }
}

impl From<&PackageCleanupPolicySpec> for CleanupPolicyPayload {
    fn from(spec: &PackageCleanupPolicySpec) -> Self {
        Self {
            key: spec.key.clone(),
            description: spec.description.clone(),
            cron_exp: spec.cron_exp.clone(),
            duration_in_minutes: spec.duration_in_minutes,
            search_criteria: SearchCriteriaPayload::from(&spec.search_criteria),
            skip_trashcan: spec.skip_trashcan,
        }
    }
}

fn expect_cleanup_policy(spec: &ResourceSpec) -> Result<&PackageCleanupPolicySpec> {
    match spec {
        ResourceSpec::PackageCleanupPolicy(policy) => Ok(policy),
        other => Err(Error::resource(
            "package_cleanup_policy",
            format!(
                "expected a cleanup policy spec, got '{}'",
                other.type_name()
            ),
        )),
    }
}

/// Handler for package cleanup policies
pub struct CleanupPolicyHandler {
    client: ArtifactoryClient,
}

impl CleanupPolicyHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    fn policy_path(key: &str) -> String {
        format!("{}/{}", POLICIES_PATH, key)
    }

    fn enablement_path(key: &str) -> String {
        format!("{}/{}/enablement", POLICIES_PATH, key)
    }

    /// Push the enablement flag, then read back the merged state
    async fn finish_write(
        &self,
        policy: &PackageCleanupPolicySpec,
    ) -> Result<ObservedState> {
        self.client
            .put_json(
                &Self::enablement_path(&policy.key),
                &EnablementPayload {
                    enabled: policy.enabled,
                },
            )
            .await?;

        self.read(&policy.key).await?.ok_or_else(|| {
            Error::resource(
                "package_cleanup_policy",
                format!("cleanup policy '{}' not present after write", policy.key),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for CleanupPolicyHandler {
    async fn create(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let policy = expect_cleanup_policy(spec)?;
        policy.validate()?;

        self.client
            .post_json(
                &Self::policy_path(&policy.key),
                &CleanupPolicyPayload::from(policy),
            )
            .await?;

        self.finish_write(policy).await
    }

    async fn read(&self, key: &str) -> Result<Option<ObservedState>> {
        let Some(mut attributes) = self.client.get_json(&Self::policy_path(key)).await? else {
            return Ok(None);
        };

        // The policy body carries no enablement flag; merge it in
        if let Some(enablement) = self.client.get_json(&Self::enablement_path(key)).await?
            && let Some(enabled) = enablement.get("enabled")
            && let Some(object) = attributes.as_object_mut()
        {
            object.insert("enabled".to_string(), enabled.clone());
        }

        Ok(Some(ObservedState {
            key: key.to_string(),
            attributes,
        }))
    }

    async fn update(&self, _key: &str, spec: &ResourceSpec) -> Result<ObservedState> {
        let policy = expect_cleanup_policy(spec)?;
        policy.validate()?;

        self.client
            .put_json(
                &Self::policy_path(&policy.key),
                &CleanupPolicyPayload::from(policy),
            )
            .await?;

        self.finish_write(policy).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client.delete(&Self::policy_path(key)).await
    }

    fn desired_payload(&self, spec: &ResourceSpec) -> Result<serde_json::Value> {
        let policy = expect_cleanup_policy(spec)?;
        let mut payload = serde_json::to_value(CleanupPolicyPayload::from(policy))?;
        // Drift comparison sees the merged view, enablement included
        if let Some(object) = payload.as_object_mut() {
            object.insert("enabled".to_string(), serde_json::json!(policy.enabled));
        }
        Ok(payload)
    }

    fn resource_type(&self) -> &'static str {
        "package_cleanup_policy"
    }
}

/// Factory for creating CleanupPolicyHandler instances
pub struct CleanupPolicyHandlerFactory;

impl ResourceHandlerFactory for CleanupPolicyHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(CleanupPolicyHandler::new(endpoint)?))
    }
}
