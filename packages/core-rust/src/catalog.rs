//! Brokered service catalog.
//!
//! Maps a (service name, plan name) pair from the broker's catalog to the
//! template backing applications and services deployed for each instance.
//! Loaded once at startup and shared read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::types::{BackingApplication, BackingService, TargetSpec};

/// Errors raised while loading the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid brokered services catalog: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// One catalog entry: the template deployed for a service plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokeredService {
    pub service_name: String,
    pub plan_name: String,
    #[serde(default)]
    pub apps: Vec<BackingApplication>,
    #[serde(default)]
    pub services: Vec<BackingService>,
    /// Target strategy applied to `apps` and `services`; `None` leaves names as-is.
    #[serde(default)]
    pub target: Option<TargetSpec>,
}

impl BrokeredService {
    #[must_use]
    pub fn new(service_name: impl Into<String>, plan_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            plan_name: plan_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_app(mut self, app: BackingApplication) -> Self {
        self.apps.push(app);
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: BackingService) -> Self {
        self.services.push(service);
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.target = Some(target);
        self
    }
}

/// Ordered collection of [`BrokeredService`] entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrokeredServices {
    entries: Vec<BrokeredService>,
}

impl BrokeredServices {
    #[must_use]
    pub fn new(entries: Vec<BrokeredService>) -> Self {
        Self { entries }
    }

    /// Parses a JSON array of brokered services.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] if the text is not a valid catalog.
    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns the first entry whose service name and plan name both match.
    #[must_use]
    pub fn find(&self, service_name: &str, plan_name: &str) -> Option<&BrokeredService> {
        self.entries
            .iter()
            .find(|entry| entry.service_name == service_name && entry.plan_name == plan_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BrokeredService> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<BrokeredService> for BrokeredServices {
    fn from_iter<I: IntoIterator<Item = BrokeredService>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
