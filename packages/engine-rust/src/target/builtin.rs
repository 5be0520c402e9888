use std::collections::BTreeMap;
use std::sync::Arc;

use appbroker_core::ArtifactDetails;

use super::{
    Target, TargetContext, DEFAULT_MAX_NAME_LENGTH, KEEP_TARGET_ON_DELETE_PROPERTY_KEY,
    TARGET_PROPERTY_KEY,
};
use crate::extension::{EmptyConfig, ExtensionFactory};

fn suffixed(name: &str, service_instance_id: &str) -> String {
    format!("{name}-{service_instance_id}")
}

fn grouped(properties: &BTreeMap<String, String>, target: String) -> BTreeMap<String, String> {
    let mut properties = properties.clone();
    properties.insert(TARGET_PROPERTY_KEY.to_string(), target);
    properties.insert(KEEP_TARGET_ON_DELETE_PROPERTY_KEY.to_string(), "true".to_string());
    properties
}

// ---------------------------------------------------------------------------
// per-instance-grouping
// ---------------------------------------------------------------------------

/// One deployment grouping per service instance, keyed by the instance id.
pub struct PerInstanceGrouping;

impl Target for PerInstanceGrouping {
    fn to_artifact_details(
        &self,
        ctx: &TargetContext<'_>,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> ArtifactDetails {
        ArtifactDetails {
            name: suffixed(name, ctx.service_instance_id),
            properties: grouped(properties, ctx.service_instance_id.to_string()),
        }
    }
}

pub struct PerInstanceGroupingFactory;

impl ExtensionFactory for PerInstanceGroupingFactory {
    type Extension = dyn Target;
    type Config = EmptyConfig;

    fn name(&self) -> &'static str {
        "per-instance-grouping"
    }

    fn create(&self, _config: EmptyConfig) -> Arc<dyn Target> {
        Arc::new(PerInstanceGrouping)
    }
}

// ---------------------------------------------------------------------------
// per-plan-grouping
// ---------------------------------------------------------------------------

/// One deployment grouping shared by every instance of a service plan.
pub struct PerPlanGrouping;

impl Target for PerPlanGrouping {
    fn to_artifact_details(
        &self,
        ctx: &TargetContext<'_>,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> ArtifactDetails {
        ArtifactDetails {
            name: suffixed(name, ctx.service_instance_id),
            properties: grouped(properties, format!("{}-{}", ctx.service_name, ctx.plan_name)),
        }
    }
}

pub struct PerPlanGroupingFactory;

impl ExtensionFactory for PerPlanGroupingFactory {
    type Extension = dyn Target;
    type Config = EmptyConfig;

    fn name(&self) -> &'static str {
        "per-plan-grouping"
    }

    fn create(&self, _config: EmptyConfig) -> Arc<dyn Target> {
        Arc::new(PerPlanGrouping)
    }
}

// ---------------------------------------------------------------------------
// instance-suffix
// ---------------------------------------------------------------------------

/// Appends the instance id to the name, truncating so the result fits
/// `max_name_length` characters. No grouping property is set.
pub struct InstanceSuffix {
    max_name_length: usize,
}

impl InstanceSuffix {
    #[must_use]
    pub fn new(max_name_length: usize) -> Self {
        Self { max_name_length }
    }

    fn suffixed_name(&self, name: &str, service_instance_id: &str) -> String {
        let suffix_len = service_instance_id.chars().count() + 1;
        let name_len = name.chars().count();
        if name_len + suffix_len <= self.max_name_length {
            return suffixed(name, service_instance_id);
        }
        // An id that alone exceeds the limit keeps the full suffix; only the name is cut.
        let keep = self.max_name_length.saturating_sub(suffix_len);
        let truncated: String = name.chars().take(keep).collect();
        suffixed(&truncated, service_instance_id)
    }
}

impl Target for InstanceSuffix {
    fn to_artifact_details(
        &self,
        ctx: &TargetContext<'_>,
        name: &str,
        properties: &BTreeMap<String, String>,
    ) -> ArtifactDetails {
        ArtifactDetails {
            name: self.suffixed_name(name, ctx.service_instance_id),
            properties: properties.clone(),
        }
    }
}

/// Factory for [`InstanceSuffix`]; the length limit is fixed at wiring time.
pub struct InstanceSuffixFactory {
    max_name_length: usize,
}

impl InstanceSuffixFactory {
    #[must_use]
    pub fn new(max_name_length: usize) -> Self {
        Self { max_name_length }
    }
}

impl Default for InstanceSuffixFactory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NAME_LENGTH)
    }
}

impl ExtensionFactory for InstanceSuffixFactory {
    type Extension = dyn Target;
    type Config = EmptyConfig;

    fn name(&self) -> &'static str {
        "instance-suffix"
    }

    fn create(&self, _config: EmptyConfig) -> Arc<dyn Target> {
        Arc::new(InstanceSuffix::new(self.max_name_length))
    }
}
