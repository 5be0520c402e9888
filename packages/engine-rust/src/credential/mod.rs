//! Credential provisioning.
//!
//! Backing applications list credential providers that generate secrets and
//! write them into the application's environment before deployment, and
//! release them again when the instance is deleted.

mod basic_auth;
mod generator;
mod oauth2;

use std::sync::Arc;

use appbroker_core::BackingApplication;
use async_trait::async_trait;
use futures_util::future::join_all;
use tracing::debug;

use crate::error::PipelineError;
use crate::extension::{ExtensionRegistry, ExtensionRegistryBuilder};
use crate::traits::{CredentialGenerator, OAuth2Client};

pub use basic_auth::{
    BasicAuthConfig, BasicAuthFactory, BasicAuthProvider, PASSWORD_KEY, USERNAME_KEY,
};
pub use generator::RandomCredentialGenerator;
pub use oauth2::{OAuth2Config, OAuth2Factory, OAuth2Provider};

/// Adds credentials to, or removes them from, one backing application.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn add_credentials(
        &self,
        application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication>;

    async fn delete_credentials(
        &self,
        application: BackingApplication,
        service_instance_id: &str,
    ) -> anyhow::Result<BackingApplication>;
}

/// Registry builder pre-loaded with the built-in providers.
///
/// `oauth2` is only registered when an OAuth2 client backend is supplied.
#[must_use]
pub fn builtin_credential_providers(
    generator: Arc<dyn CredentialGenerator>,
    oauth2_client: Option<Arc<dyn OAuth2Client>>,
) -> ExtensionRegistryBuilder<dyn CredentialProvider> {
    let builder =
        ExtensionRegistry::builder().register(BasicAuthFactory::new(Arc::clone(&generator)));
    match oauth2_client {
        Some(client) => builder.register(OAuth2Factory::new(generator, client)),
        None => builder,
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Add,
    Delete,
}

// ---------------------------------------------------------------------------
// CredentialProviderService
// ---------------------------------------------------------------------------

/// Runs each application's credential provider chain.
pub struct CredentialProviderService {
    providers: Arc<ExtensionRegistry<dyn CredentialProvider>>,
}

impl CredentialProviderService {
    #[must_use]
    pub fn new(providers: Arc<ExtensionRegistry<dyn CredentialProvider>>) -> Self {
        Self { providers }
    }

    /// Applies every configured provider, in order, to each application.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing application in
    /// input order, after every chain has finished.
    pub async fn add_credentials(
        &self,
        applications: Vec<BackingApplication>,
        service_instance_id: &str,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        self.run(applications, service_instance_id, Phase::Add).await
    }

    /// Mirror of [`add_credentials`](Self::add_credentials) releasing the secrets.
    ///
    /// # Errors
    ///
    /// Returns the [`PipelineError`] of the first failing application in
    /// input order, after every chain has finished.
    pub async fn delete_credentials(
        &self,
        applications: Vec<BackingApplication>,
        service_instance_id: &str,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        self.run(applications, service_instance_id, Phase::Delete).await
    }

    async fn run(
        &self,
        applications: Vec<BackingApplication>,
        service_instance_id: &str,
        phase: Phase,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        // Chains are independent; a failure must not drop a sibling mid-provider.
        join_all(
            applications
                .into_iter()
                .map(|application| self.run_chain(application, service_instance_id, phase)),
        )
        .await
        .into_iter()
        .collect()
    }

    async fn run_chain(
        &self,
        mut application: BackingApplication,
        service_instance_id: &str,
        phase: Phase,
    ) -> Result<BackingApplication, PipelineError> {
        let specs = application.credential_providers.clone();
        for spec in &specs {
            let provider = self.providers.resolve_spec(spec)?;
            let entity = application.name.clone();
            debug!(
                provider = %spec.name,
                application = %entity,
                service_instance_id,
                ?phase,
                "applying credential provider"
            );
            let result = match phase {
                Phase::Add => provider.add_credentials(application, service_instance_id).await,
                Phase::Delete => {
                    provider
                        .delete_credentials(application, service_instance_id)
                        .await
                }
            };
            application = result.map_err(|e| PipelineError::step(&spec.name, &entity, e))?;
        }
        Ok(application)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
