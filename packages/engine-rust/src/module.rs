//! Wiring of the engine's services.
//!
//! `BrokerModule` allocates the extension registries and the services built
//! on them once, at startup. Everything it hands out is an `Arc` so the
//! embedding process can share the services across request handlers.

use std::sync::Arc;

use appbroker_core::BrokeredServices;
use tracing::info;

use crate::config::EngineConfig;
use crate::credential::{
    builtin_credential_providers, CredentialProvider, CredentialProviderService,
};
use crate::extension::{ExtensionError, ExtensionFactory, ExtensionRegistryBuilder};
use crate::lifecycle::BackingAppManagementService;
use crate::provisioning::ProvisioningPipeline;
use crate::state::{
    InMemoryServiceInstanceBindingStateRepository, InMemoryServiceInstanceStateRepository,
    ServiceInstanceBindingStateRepository, ServiceInstanceStateRepository,
};
use crate::target::{builtin_targets, Target, TargetService};
use crate::traits::{CredentialGenerator, DeployerClient, OAuth2Client};
use crate::transform::{
    builtin_service_transformers, builtin_transformers, ParametersTransformationService,
    ParametersTransformer, ServiceParametersTransformer,
};

/// External systems the engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub deployer: Arc<dyn DeployerClient>,
    pub credential_generator: Arc<dyn CredentialGenerator>,
    /// Enables the `oauth2` credential provider when present.
    pub oauth2_client: Option<Arc<dyn OAuth2Client>>,
}

// ---------------------------------------------------------------------------
// BrokerModuleBuilder
// ---------------------------------------------------------------------------

/// Collects extension factories on top of the built-ins before wiring.
pub struct BrokerModuleBuilder {
    config: EngineConfig,
    collaborators: Collaborators,
    targets: ExtensionRegistryBuilder<dyn Target>,
    transformers: ExtensionRegistryBuilder<dyn ParametersTransformer>,
    service_transformers: ExtensionRegistryBuilder<dyn ServiceParametersTransformer>,
    credential_providers: ExtensionRegistryBuilder<dyn CredentialProvider>,
    instance_state: Option<Arc<dyn ServiceInstanceStateRepository>>,
    binding_state: Option<Arc<dyn ServiceInstanceBindingStateRepository>>,
}

impl BrokerModuleBuilder {
    fn new(config: EngineConfig, collaborators: Collaborators) -> Self {
        let credential_providers = builtin_credential_providers(
            Arc::clone(&collaborators.credential_generator),
            collaborators.oauth2_client.clone(),
        );
        Self {
            targets: builtin_targets(config.max_name_length),
            transformers: builtin_transformers(),
            service_transformers: builtin_service_transformers(),
            credential_providers,
            config,
            collaborators,
            instance_state: None,
            binding_state: None,
        }
    }

    #[must_use]
    pub fn target<F>(mut self, factory: F) -> Self
    where
        F: ExtensionFactory<Extension = dyn Target>,
    {
        self.targets = self.targets.register(factory);
        self
    }

    #[must_use]
    pub fn parameters_transformer<F>(mut self, factory: F) -> Self
    where
        F: ExtensionFactory<Extension = dyn ParametersTransformer>,
    {
        self.transformers = self.transformers.register(factory);
        self
    }

    #[must_use]
    pub fn service_parameters_transformer<F>(mut self, factory: F) -> Self
    where
        F: ExtensionFactory<Extension = dyn ServiceParametersTransformer>,
    {
        self.service_transformers = self.service_transformers.register(factory);
        self
    }

    #[must_use]
    pub fn credential_provider<F>(mut self, factory: F) -> Self
    where
        F: ExtensionFactory<Extension = dyn CredentialProvider>,
    {
        self.credential_providers = self.credential_providers.register(factory);
        self
    }

    /// Replaces the in-memory instance state repository.
    #[must_use]
    pub fn instance_state(mut self, repository: Arc<dyn ServiceInstanceStateRepository>) -> Self {
        self.instance_state = Some(repository);
        self
    }

    /// Replaces the in-memory binding state repository.
    #[must_use]
    pub fn binding_state(
        mut self,
        repository: Arc<dyn ServiceInstanceBindingStateRepository>,
    ) -> Self {
        self.binding_state = Some(repository);
        self
    }

    /// Builds the registries and wires the services.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::DuplicateName`] if two factories of the same
    /// kind share a name.
    pub fn build(self, catalog: BrokeredServices) -> Result<BrokerModule, ExtensionError> {
        let targets = Arc::new(self.targets.build()?);
        let transformers = Arc::new(self.transformers.build()?);
        let service_transformers = Arc::new(self.service_transformers.build()?);
        let credential_providers = Arc::new(self.credential_providers.build()?);
        info!(
            targets = ?targets.names(),
            parameters_transformers = ?transformers.names(),
            service_parameters_transformers = ?service_transformers.names(),
            credential_providers = ?credential_providers.names(),
            brokered_services = catalog.len(),
            "broker module ready"
        );

        let catalog = Arc::new(catalog);
        let target_service = Arc::new(TargetService::new(targets));
        let lifecycle = Arc::new(BackingAppManagementService::new(
            Arc::clone(&catalog),
            self.collaborators.deployer,
            Arc::clone(&target_service),
            &self.config,
        ));
        let provisioning = Arc::new(ProvisioningPipeline::new(
            target_service,
            Arc::new(ParametersTransformationService::new(
                transformers,
                service_transformers,
            )),
            Arc::new(CredentialProviderService::new(credential_providers)),
        ));

        Ok(BrokerModule {
            config: self.config,
            catalog,
            lifecycle,
            provisioning,
            instance_state: self
                .instance_state
                .unwrap_or_else(|| Arc::new(InMemoryServiceInstanceStateRepository::new())),
            binding_state: self
                .binding_state
                .unwrap_or_else(|| Arc::new(InMemoryServiceInstanceBindingStateRepository::new())),
        })
    }
}

// ---------------------------------------------------------------------------
// BrokerModule
// ---------------------------------------------------------------------------

/// The wired engine: catalog, lifecycle manager, provisioning pipeline, and
/// operation state repositories.
pub struct BrokerModule {
    config: EngineConfig,
    catalog: Arc<BrokeredServices>,
    lifecycle: Arc<BackingAppManagementService>,
    provisioning: Arc<ProvisioningPipeline>,
    instance_state: Arc<dyn ServiceInstanceStateRepository>,
    binding_state: Arc<dyn ServiceInstanceBindingStateRepository>,
}

impl BrokerModule {
    /// Wires the engine with only the built-in extensions.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] if the built-in registries cannot be built.
    pub fn new(
        config: EngineConfig,
        catalog: BrokeredServices,
        collaborators: Collaborators,
    ) -> Result<Self, ExtensionError> {
        Self::builder(config, collaborators).build(catalog)
    }

    #[must_use]
    pub fn builder(config: EngineConfig, collaborators: Collaborators) -> BrokerModuleBuilder {
        BrokerModuleBuilder::new(config, collaborators)
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<BrokeredServices> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn lifecycle(&self) -> Arc<BackingAppManagementService> {
        Arc::clone(&self.lifecycle)
    }

    #[must_use]
    pub fn provisioning(&self) -> Arc<ProvisioningPipeline> {
        Arc::clone(&self.provisioning)
    }

    #[must_use]
    pub fn instance_state(&self) -> Arc<dyn ServiceInstanceStateRepository> {
        Arc::clone(&self.instance_state)
    }

    #[must_use]
    pub fn binding_state(&self) -> Arc<dyn ServiceInstanceBindingStateRepository> {
        Arc::clone(&self.binding_state)
    }
}
