//! Property set handler
//!
//! Property sets live in the `propertySets` block of the system
//! configuration. Within a set, properties and their predefined values are
//! maps keyed by name, not lists, so the declared list form is converted on
//! the way out.

use std::collections::BTreeMap;

use async_trait::async_trait;

use artcfg_client::{yaml, ArtifactoryClient};
use artcfg_core::config::EndpointConfig;
use artcfg_core::spec::{PropertySetSpec, ResourceSpec};
use artcfg_core::traits::{ObservedState, ResourceHandler, ResourceHandlerFactory};
use artcfg_core::{Error, Result};
use serde::Serialize;

const ROOT: &str = "propertySets";

/// YAML payload of one property set entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertySetPayload {
    visible: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    properties: BTreeMap<String, PropertyPayload>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PropertyPayload {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    predefined_values: BTreeMap<String, PredefinedValuePayload>,
    closed_predefined_values: bool,
    multiple_choice: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredefinedValuePayload {
    default_value: bool,
}

impl From<&PropertySetSpec> for PropertySetPayload {
    fn from(spec: &PropertySetSpec) -> Self {
        let properties = spec
            .properties
            .iter()
            .map(|property| {
                let predefined_values = property
                    .predefined_values
                    .iter()
                    .map(|value| {
                        (
                            value.name.clone(),
                            PredefinedValuePayload {
                                default_value: value.default_value,
                            },
                        )
                    })
                    .collect();
                (
                    property.name.clone(),
                    PropertyPayload {
                        predefined_values,
                        closed_predefined_values: property.closed_predefined_values,
                        multiple_choice: property.multiple_choice,
                    },
                )
            })
            .collect();

        Self {
            visible: spec.visible,
            properties,
        }
    }
}

fn expect_property_set(spec: &ResourceSpec) -> Result<&PropertySetSpec> {
    match spec {
        ResourceSpec::PropertySet(set) => Ok(set),
        other => Err(Error::resource(
            "property_set",
            format!("expected a property set spec, got '{}'", other.type_name()),
        )),
    }
}

/// Handler for property sets
pub struct PropertySetHandler {
    client: ArtifactoryClient,
}

impl PropertySetHandler {
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        Ok(Self {
            client: ArtifactoryClient::new(endpoint)?,
        })
    }

    async fn apply(&self, spec: &ResourceSpec) -> Result<ObservedState> {
        let set = expect_property_set(spec)?;
        set.validate()?;

        let body = yaml::keyed_block(ROOT, &set.name, &PropertySetPayload::from(set))?;
        self.client.patch_system_yaml(&body).await?;

        self.read(&set.name).await?.ok_or_else(|| {
            Error::resource(
                "property_set",
                format!("property set '{}' not present after write", set.name),
            )
        })
    }
}

#[async_trait]
impl ResourceHandler for PropertySetHandler {
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
        let set = expect_property_set(spec)?;
        Ok(serde_json::to_value(PropertySetPayload::from(set))?)
    }

    fn resource_type(&self) -> &'static str {
        "property_set"
    }
}

/// Factory for creating PropertySetHandler instances
pub struct PropertySetHandlerFactory;

impl ResourceHandlerFactory for PropertySetHandlerFactory {
    fn create(&self, endpoint: &EndpointConfig) -> Result<Box<dyn ResourceHandler>> {
        Ok(Box::new(PropertySetHandler::new(endpoint)?))
    }
}
