//! Preparation of a brokered service's backing entities for deployment.
//!
//! Chains target resolution, parameter transformation, and credential
//! provisioning in the order the deployment workflows need them. The
//! prepared entities are handed to the platform adapter by the caller.

use std::sync::Arc;

use appbroker_core::{BackingApplication, BackingService, BrokeredService, Parameters};
use tracing::debug;

use crate::credential::CredentialProviderService;
use crate::error::PipelineError;
use crate::target::{TargetContext, TargetService};
use crate::transform::ParametersTransformationService;

pub struct ProvisioningPipeline {
    targets: Arc<TargetService>,
    transformation: Arc<ParametersTransformationService>,
    credentials: Arc<CredentialProviderService>,
}

impl ProvisioningPipeline {
    #[must_use]
    pub fn new(
        targets: Arc<TargetService>,
        transformation: Arc<ParametersTransformationService>,
        credentials: Arc<CredentialProviderService>,
    ) -> Self {
        Self {
            targets,
            transformation,
            credentials,
        }
    }

    /// Produces the deployable applications of `brokered` for a create or
    /// update request: target, then parameters, then credentials.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any stage.
    pub async fn prepare_applications(
        &self,
        brokered: &BrokeredService,
        service_instance_id: &str,
        parameters: &Parameters,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        debug!(
            service_instance_id,
            service_name = %brokered.service_name,
            plan_name = %brokered.plan_name,
            applications = brokered.apps.len(),
            "preparing backing applications"
        );
        let applications = self.targeted_applications(brokered, service_instance_id)?;
        let applications = self
            .transformation
            .transform_applications(applications, parameters)
            .await?;
        self.credentials
            .add_credentials(applications, service_instance_id)
            .await
    }

    /// Produces the backing services of `brokered` with their final instance
    /// names and transformed parameters.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any stage.
    pub async fn prepare_services(
        &self,
        brokered: &BrokeredService,
        service_instance_id: &str,
        parameters: &Parameters,
    ) -> Result<Vec<BackingService>, PipelineError> {
        let ctx = context(brokered, service_instance_id);
        let services = self.targets.apply_to_services(
            brokered.services.clone(),
            brokered.target.as_ref(),
            &ctx,
        )?;
        self.transformation
            .transform_services(services, parameters)
            .await
    }

    /// Produces the applications to undeploy for a delete request, releasing
    /// the credentials that were generated for them.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineError`] raised by any stage.
    pub async fn prepare_applications_for_delete(
        &self,
        brokered: &BrokeredService,
        service_instance_id: &str,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        let applications = self.targeted_applications(brokered, service_instance_id)?;
        self.credentials
            .delete_credentials(applications, service_instance_id)
            .await
    }

    fn targeted_applications(
        &self,
        brokered: &BrokeredService,
        service_instance_id: &str,
    ) -> Result<Vec<BackingApplication>, PipelineError> {
        let ctx = context(brokered, service_instance_id);
        Ok(self.targets.apply_to_applications(
            brokered.apps.clone(),
            brokered.target.as_ref(),
            &ctx,
        )?)
    }
}

fn context<'a>(brokered: &'a BrokeredService, service_instance_id: &'a str) -> TargetContext<'a> {
    TargetContext {
        service_instance_id,
        service_name: &brokered.service_name,
        plan_name: &brokered.plan_name,
    }
}
