use std::sync::Arc;

use appbroker_core::{BackingApplication, DeployedApplication};
use tracing::debug;

use super::LifecycleAction;
use crate::traits::DeployerClient;

/// Addresses one backing application on the platform by its final name and
/// deployment properties.
#[derive(Clone)]
pub struct ManagementClient {
    deployer: Arc<dyn DeployerClient>,
}

impl ManagementClient {
    #[must_use]
    pub fn new(deployer: Arc<dyn DeployerClient>) -> Self {
        Self { deployer }
    }

    /// Fetches the live description of `application`.
    ///
    /// # Errors
    ///
    /// Propagates the platform adapter's error.
    pub async fn get(
        &self,
        application: &BackingApplication,
    ) -> anyhow::Result<DeployedApplication> {
        debug!(application = %application.name, "fetching deployed application");
        self.deployer
            .get(&application.name, &application.properties)
            .await
    }

    /// Dispatches `action` to the platform adapter.
    ///
    /// # Errors
    ///
    /// Propagates the platform adapter's error.
    pub async fn run(
        &self,
        action: LifecycleAction,
        application: &BackingApplication,
    ) -> anyhow::Result<()> {
        debug!(application = %application.name, %action, "dispatching lifecycle action");
        let (name, properties) = (&application.name, &application.properties);
        match action {
            LifecycleAction::Start => self.deployer.start(name, properties).await,
            LifecycleAction::Stop => self.deployer.stop(name, properties).await,
            LifecycleAction::Restart => self.deployer.restart(name, properties).await,
            LifecycleAction::Restage => self.deployer.restage(name, properties).await,
        }
    }
}
