//! Backing-application lifecycle management.
//!
//! Lifecycle operations on a service instance fan out to every backing
//! application of its catalog entry. Calls are issued concurrently and the
//! operation completes once every call has finished.

mod client;
mod manager;

use std::fmt;

use crate::extension::ExtensionError;

pub use client::ManagementClient;
pub use manager::BackingAppManagementService;

/// Lifecycle action applied to every backing application of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleAction {
    Start,
    Stop,
    Restart,
    Restage,
}

impl LifecycleAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::Restage => "restage",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One application's failed platform call.
#[derive(Debug)]
pub struct ApplicationFailure {
    pub application: String,
    pub error: anyhow::Error,
}

impl fmt::Display for ApplicationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.application, self.error)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The platform adapter could not describe the service instance.
    #[error("platform lookup failed: {0:#}")]
    Platform(anyhow::Error),
    #[error(transparent)]
    Target(#[from] ExtensionError),
    #[error(
        "{action} failed for {} application(s) of service instance '{service_instance_id}'",
        .failures.len()
    )]
    ActionFailed {
        action: LifecycleAction,
        service_instance_id: String,
        failures: Vec<ApplicationFailure>,
    },
    #[error(
        "lookup of {} deployed application(s) of service instance '{service_instance_id}' failed",
        .failures.len()
    )]
    QueryFailed {
        service_instance_id: String,
        failures: Vec<ApplicationFailure>,
    },
}

impl LifecycleError {
    /// Per-application failures carried by this error; empty for lookup errors.
    #[must_use]
    pub fn failures(&self) -> &[ApplicationFailure] {
        match self {
            Self::ActionFailed { failures, .. } | Self::QueryFailed { failures, .. } => failures,
            Self::Platform(_) | Self::Target(_) => &[],
        }
    }
}
