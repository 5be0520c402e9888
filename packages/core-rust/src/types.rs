use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Untyped key/value arguments attached to an extension reference.
pub type ExtensionArgs = serde_json::Map<String, Value>;

/// Caller-supplied request parameters shared by every transformer in a request.
pub type Parameters = serde_json::Map<String, Value>;

/// Reference to a named extension plus its untyped configuration.
///
/// The same shape is used for all three extension kinds; the aliases below
/// only document which registry a spec is meant to be resolved against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionSpec {
    /// Registered name of the extension.
    pub name: String,
    /// Arguments bound onto the extension's configuration at resolution time.
    #[serde(default)]
    pub args: ExtensionArgs,
}

impl ExtensionSpec {
    /// Creates a spec with no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: ExtensionArgs::new(),
        }
    }

    /// Adds a single argument, replacing any previous value for `key`.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }
}

pub type ParametersTransformerSpec = ExtensionSpec;
pub type CredentialProviderSpec = ExtensionSpec;
pub type TargetSpec = ExtensionSpec;

/// Reference from a backing application to a service instance it binds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesSpec {
    pub service_instance_name: String,
}

/// A deployable unit materialized on behalf of one service instance.
///
/// Cloned from a catalog template at the start of each request and then
/// mutated in place by the target, transformation and credential stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackingApplication {
    pub name: String,
    /// Deployable artifact reference (path or URL), opaque to the engine.
    #[serde(default)]
    pub path: String,
    /// Deployment-platform properties (memory, instances, target grouping...).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Runtime environment handed to the deployed application.
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,
    #[serde(default)]
    pub parameters_transformers: Vec<ParametersTransformerSpec>,
    #[serde(default)]
    pub credential_providers: Vec<CredentialProviderSpec>,
    #[serde(default)]
    pub services: Vec<ServicesSpec>,
}

impl BackingApplication {
    /// Creates an application with only a name and artifact path set.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, spec: ParametersTransformerSpec) -> Self {
        self.parameters_transformers.push(spec);
        self
    }

    #[must_use]
    pub fn with_credential_provider(mut self, spec: CredentialProviderSpec) -> Self {
        self.credential_providers.push(spec);
        self
    }

    #[must_use]
    pub fn with_service(mut self, service_instance_name: impl Into<String>) -> Self {
        self.services.push(ServicesSpec {
            service_instance_name: service_instance_name.into(),
        });
        self
    }
}

/// An external service dependency provisioned alongside backing applications.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackingService {
    /// Name of the service offering in the platform marketplace.
    pub name: String,
    /// Name the provisioned service instance is given.
    pub service_instance_name: String,
    pub plan: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters_transformers: Vec<ParametersTransformerSpec>,
}

impl BackingService {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        service_instance_name: impl Into<String>,
        plan: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            service_instance_name: service_instance_name.into(),
            plan: plan.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_transformer(mut self, spec: ParametersTransformerSpec) -> Self {
        self.parameters_transformers.push(spec);
        self
    }
}

/// Final name and properties computed by a target strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDetails {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

/// Live description of an application as reported by the deployment platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedApplication {
    pub name: String,
    #[serde(default)]
    pub environment: BTreeMap<String, Value>,
    /// Names of the service instances currently bound to the application.
    #[serde(default)]
    pub services: Vec<String>,
}

impl From<DeployedApplication> for BackingApplication {
    fn from(deployed: DeployedApplication) -> Self {
        Self {
            name: deployed.name,
            environment: deployed.environment,
            services: deployed
                .services
                .into_iter()
                .map(|service_instance_name| ServicesSpec {
                    service_instance_name,
                })
                .collect(),
            ..Self::default()
        }
    }
}
