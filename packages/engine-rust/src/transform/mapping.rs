//! Built-in transformers that copy allow-listed request parameters onto an
//! application's environment or properties, or onto a service's parameters.
//!
//! Request values always replace an existing entry with the same key. Keys
//! in the allow-list that the request does not carry are skipped.

use std::sync::Arc;

use appbroker_core::{BackingApplication, BackingService, Parameters};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::{ParametersTransformer, ServiceParametersTransformer};
use crate::extension::args::string_list;
use crate::extension::ExtensionFactory;

/// Shared configuration: the request-parameter keys to copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct MappingConfig {
    #[serde(deserialize_with = "string_list")]
    pub include: Vec<String>,
}

impl MappingConfig {
    fn selected<'a>(
        &'a self,
        parameters: &'a Parameters,
    ) -> impl Iterator<Item = (&'a String, &'a Value)> + 'a {
        self.include
            .iter()
            .filter_map(move |key| parameters.get(key).map(|value| (key, value)))
    }
}

/// Renders a JSON value as a platform property string (strings unquoted).
fn property_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// env-mapping
// ---------------------------------------------------------------------------

pub struct EnvironmentMappingTransformer {
    config: MappingConfig,
}

#[async_trait]
impl ParametersTransformer for EnvironmentMappingTransformer {
    async fn transform(
        &self,
        mut application: BackingApplication,
        parameters: &Parameters,
    ) -> anyhow::Result<BackingApplication> {
        for (key, value) in self.config.selected(parameters) {
            application.environment.insert(key.clone(), value.clone());
        }
        Ok(application)
    }
}

pub struct EnvironmentMappingFactory;

impl ExtensionFactory for EnvironmentMappingFactory {
    type Extension = dyn ParametersTransformer;
    type Config = MappingConfig;

    fn name(&self) -> &'static str {
        "env-mapping"
    }

    fn create(&self, config: MappingConfig) -> Arc<dyn ParametersTransformer> {
        Arc::new(EnvironmentMappingTransformer { config })
    }
}

// ---------------------------------------------------------------------------
// property-mapping
// ---------------------------------------------------------------------------

pub struct PropertyMappingTransformer {
    config: MappingConfig,
}

#[async_trait]
impl ParametersTransformer for PropertyMappingTransformer {
    async fn transform(
        &self,
        mut application: BackingApplication,
        parameters: &Parameters,
    ) -> anyhow::Result<BackingApplication> {
        for (key, value) in self.config.selected(parameters) {
            application
                .properties
                .insert(key.clone(), property_string(value));
        }
        Ok(application)
    }
}

pub struct PropertyMappingFactory;

impl ExtensionFactory for PropertyMappingFactory {
    type Extension = dyn ParametersTransformer;
    type Config = MappingConfig;

    fn name(&self) -> &'static str {
        "property-mapping"
    }

    fn create(&self, config: MappingConfig) -> Arc<dyn ParametersTransformer> {
        Arc::new(PropertyMappingTransformer { config })
    }
}

// ---------------------------------------------------------------------------
// parameter-mapping
// ---------------------------------------------------------------------------

pub struct ParameterMappingTransformer {
    config: MappingConfig,
}

#[async_trait]
impl ServiceParametersTransformer for ParameterMappingTransformer {
    async fn transform(
        &self,
        mut service: BackingService,
        parameters: &Parameters,
    ) -> anyhow::Result<BackingService> {
        for (key, value) in self.config.selected(parameters) {
            service.parameters.insert(key.clone(), value.clone());
        }
        Ok(service)
    }
}

pub struct ParameterMappingFactory;

impl ExtensionFactory for ParameterMappingFactory {
    type Extension = dyn ServiceParametersTransformer;
    type Config = MappingConfig;

    fn name(&self) -> &'static str {
        "parameter-mapping"
    }

    fn create(&self, config: MappingConfig) -> Arc<dyn ServiceParametersTransformer> {
        Arc::new(ParameterMappingTransformer { config })
    }
}
