//! Target resolution.
//!
//! A target strategy decides where and under which name the backing
//! applications and services of one service instance are deployed. The
//! strategy named in the catalog entry is resolved (without arguments) and
//! applied to every entity of the instance; the resulting [`ArtifactDetails`]
//! replace the entity's name and properties.

mod builtin;

use std::collections::BTreeMap;
use std::sync::Arc;

use appbroker_core::{
    ArtifactDetails, BackingApplication, BackingService, ExtensionArgs, TargetSpec,
};

use crate::extension::{ExtensionError, ExtensionRegistry, ExtensionRegistryBuilder};

pub use builtin::{
    InstanceSuffix, InstanceSuffixFactory, PerInstanceGrouping, PerInstanceGroupingFactory,
    PerPlanGrouping, PerPlanGroupingFactory,
};

/// Property naming the deployment grouping (space, namespace...) to use.
pub const TARGET_PROPERTY_KEY: &str = "target";
/// Property asking the platform adapter to keep the grouping when the instance is deleted.
pub const KEEP_TARGET_ON_DELETE_PROPERTY_KEY: &str = "keep-target-on-delete";
/// Maximum application name length accepted by the reference platform.
pub const DEFAULT_MAX_NAME_LENGTH: usize = 50;

/// Identifies the service instance a set of entities is being deployed for.
#[derive(Debug, Clone, Copy)]
pub struct TargetContext<'a> {
    pub service_instance_id: &'a str,
    pub service_name: &'a str,
    pub plan_name: &'a str,
}

/// Strategy computing the final name and properties of one entity.
pub trait Target: Send + Sync {
    fn to_artifact_details(
        &self,
        ctx: &TargetContext<'_>,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> ArtifactDetails;
}

/// Registry builder pre-loaded with the built-in targets.
#[must_use]
pub fn builtin_targets(max_name_length: usize) -> ExtensionRegistryBuilder<dyn Target> {
    ExtensionRegistry::builder()
        .register(PerInstanceGroupingFactory)
        .register(PerPlanGroupingFactory)
        .register(InstanceSuffixFactory::new(max_name_length))
}

// ---------------------------------------------------------------------------
// TargetService
// ---------------------------------------------------------------------------

/// Applies a catalog entry's target strategy to applications and services.
pub struct TargetService {
    targets: Arc<ExtensionRegistry<dyn Target>>,
}

impl TargetService {
    #[must_use]
    pub fn new(targets: Arc<ExtensionRegistry<dyn Target>>) -> Self {
        Self { targets }
    }

    fn resolve(
        &self,
        spec: Option<&TargetSpec>,
    ) -> Result<Option<Arc<dyn Target>>, ExtensionError> {
        spec.map(|spec| self.targets.resolve(&spec.name, &ExtensionArgs::new()))
            .transpose()
    }

    /// Renames and re-targets every application; no spec leaves them untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] if the named target is not registered.
    pub fn apply_to_applications(
        &self,
        mut applications: Vec<BackingApplication>,
        spec: Option<&TargetSpec>,
        ctx: &TargetContext<'_>,
    ) -> Result<Vec<BackingApplication>, ExtensionError> {
        if let Some(target) = self.resolve(spec)? {
            for application in &mut applications {
                let details =
                    target.to_artifact_details(ctx, &application.name, &application.properties);
                application.name = details.name;
                application.properties = details.properties;
            }
        }
        Ok(applications)
    }

    /// Renames and re-targets every backing service instance.
    ///
    /// The service's instance name is the one rewritten; the marketplace
    /// offering name stays as configured.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError`] if the named target is not registered.
    pub fn apply_to_services(
        &self,
        mut services: Vec<BackingService>,
        spec: Option<&TargetSpec>,
        ctx: &TargetContext<'_>,
    ) -> Result<Vec<BackingService>, ExtensionError> {
        if let Some(target) = self.resolve(spec)? {
            for service in &mut services {
                let details = target.to_artifact_details(
                    ctx,
                    &service.service_instance_name,
                    &service.properties,
                );
                service.service_instance_name = details.name;
                service.properties = details.properties;
            }
        }
        Ok(services)
    }
}
