//! Parameter transformation pipeline.
//!
//! Each backing application or service lists an ordered chain of named
//! transformers. The chain runs in order against the request parameters,
//! each step seeing the previous step's changes. Different entities are
//! transformed concurrently; each owns its data, so no chain observes
//! another's intermediate state.

mod mapping;

use std::sync::Arc;

use appbroker_core::{BackingApplication, BackingService, Parameters};
use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::debug;

use crate::error::PipelineError;
use crate::extension::{ExtensionRegistry, ExtensionRegistryBuilder};

pub use mapping::{
    EnvironmentMappingFactory, EnvironmentMappingTransformer, MappingConfig,
    ParameterMappingFactory, ParameterMappingTransformer, PropertyMappingFactory,
    PropertyMappingTransformer,
};

/// Transforms a backing application using the request parameters.
#[async_trait]
pub trait ParametersTransformer: Send + Sync {
    async fn transform(
        &self,
        application: BackingApplication,
        parameters: &Parameters,
    ) -> anyhow::Result<BackingApplication>;
}

/// Transforms a backing service using the request parameters.
#[async_trait]
pub trait ServiceParametersTransformer: Send + Sync {
    async fn transform(
        &self,
        service: BackingService,
        parameters: &Parameters,
    ) -> anyhow::Result<BackingService>;
}

/// Registry builder pre-loaded with the built-in application transformers.
#[must_use]
pub fn builtin_transformers() -> ExtensionRegistryBuilder<dyn ParametersTransformer> {
    ExtensionRegistry::builder()
        .register(EnvironmentMappingFactory)
        .register(PropertyMappingFactory)
}

/// Registry builder pre-loaded with the built-in service transformers.
#[must_use]
pub fn builtin_service_transformers() -> ExtensionRegistryBuilder<dyn ServiceParametersTransformer>
{
    ExtensionRegistry::builder().register(ParameterMappingFactory)
}

// ---------------------------------------------------------------------------
// ParametersTransformationService
// ---------------------------------------------------------------------------

/// Applies each entity's configured transformer chain.
pub struct ParametersTransformationService {
    transformers: Arc<ExtensionRegistry<dyn ParametersTransformer>>,
    service_transformers: Arc<ExtensionRegistry<dyn ServiceParametersTransformer>>,
}

impl ParametersTransformationService {
    #[must_use]
    pub fn new(
        transformers: Arc<ExtensionRegistry<dyn ParametersTransformer>>,
        service_transformers: Arc<ExtensionRegistry<dyn ServiceParametersTransformer>>,
    ) -> Self {
        Self {
            transformers,
            service_transformers,
        }
    }

    /// Runs every application's chain; output order matches input order.
    ///
    /// A failing chain does not cancel the others: every chain runs to
    /// completion before the outcome is reported.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing application in
    /// input order.
    pub async fn transform_applications(
        &self,
        applications: Vec<BackingApplication>,
        parameters: &Parameters,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        join_all(
            applications
                .into_iter()
                .map(|application| self.transform_application(application, parameters)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Runs every service's chain; output order matches input order.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing service in input
    /// order, once every chain has finished.
    pub async fn transform_services(
        &self,
        services: Vec<BackingService>,
        parameters: &Parameters,
    ) -> Result<Vec<BackingService>, PipelineError> {
        join_all(
            services
                .into_iter()
                .map(|service| self.transform_service(service, parameters)),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn transform_application(
        &self,
        mut application: BackingApplication,
        parameters: &Parameters,
    ) -> Result<BackingApplication, PipelineError> {
        let specs = application.parameters_transformers.clone();
        for spec in &specs {
            let transformer = self.transformers.resolve_spec(spec)?;
            let entity = application.name.clone();
            debug!(
                transformer = %spec.name,
                application = %entity,
                "applying parameters transformer"
            );
            application = transformer
                .transform(application, parameters)
                .await
                .map_err(|e| PipelineError::step(&spec.name, &entity, e))?;
        }
        Ok(application)
    }

    async fn transform_service(
        &self,
        mut service: BackingService,
        parameters: &Parameters,
    ) -> Result<BackingService, PipelineError> {
        let specs = service.parameters_transformers.clone();
        for spec in &specs {
            let transformer = self.service_transformers.resolve_spec(spec)?;
            let entity = service.service_instance_name.clone();
            debug!(
                transformer = %spec.name,
                service = %entity,
                "applying service parameters transformer"
            );
            service = transformer
                .transform(service, parameters)
                .await
                .map_err(|e| PipelineError::step(&spec.name, &entity, e))?;
        }
        Ok(service)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
