//! Operation state of asynchronous instance and binding operations.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an asynchronous broker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

impl OperationState {
    /// Returns `true` once the operation has finished, successfully or not.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InProgress => "in progress",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Recorded state of one instance or binding operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstanceState {
    pub operation_state: OperationState,
    /// Human-readable description surfaced to the platform's last-operation poll.
    pub description: String,
    pub last_updated: DateTime<Utc>,
}

impl ServiceInstanceState {
    /// Creates a state stamped with the current time.
    #[must_use]
    pub fn new(operation_state: OperationState, description: impl Into<String>) -> Self {
        Self {
            operation_state,
            description: description.into(),
            last_updated: Utc::now(),
        }
    }
}

/// Composite key of a binding operation.
///
/// Ordered by service instance id first, then binding id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    pub service_instance_id: String,
    pub binding_id: String,
}

impl BindingKey {
    #[must_use]
    pub fn new(service_instance_id: impl Into<String>, binding_id: impl Into<String>) -> Self {
        Self {
            service_instance_id: service_instance_id.into(),
            binding_id: binding_id.into(),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service_instance_id, self.binding_id)
    }
}
