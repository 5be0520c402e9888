//! Operation state tracking for asynchronous instance and binding operations.
//!
//! The workflow layer records `IN_PROGRESS` when it accepts an asynchronous
//! request and the final outcome when it completes; the protocol layer reads
//! the state back when the platform polls for the last operation.
//!
//! Repositories are traits so a durable backend can replace the in-memory
//! reference implementation without touching the orchestration code.

mod memory;

use appbroker_core::{OperationState, ServiceInstanceState};
use async_trait::async_trait;

pub use memory::{
    InMemoryServiceInstanceBindingStateRepository, InMemoryServiceInstanceStateRepository,
    StateTable,
};

/// Errors raised by state repositories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("no operation state recorded for service instance '{service_instance_id}'")]
    UnknownInstance { service_instance_id: String },
    #[error(
        "no operation state recorded for binding '{binding_id}' \
         of service instance '{service_instance_id}'"
    )]
    UnknownBinding {
        service_instance_id: String,
        binding_id: String,
    },
}

/// Operation state keyed by service instance id.
#[async_trait]
pub trait ServiceInstanceStateRepository: Send + Sync {
    /// Records `state` for the instance, replacing any previous entry.
    async fn save_state(
        &self,
        service_instance_id: &str,
        state: OperationState,
        description: &str,
    ) -> Result<ServiceInstanceState, StateError>;

    async fn get_state(&self, service_instance_id: &str)
        -> Result<ServiceInstanceState, StateError>;

    /// Removes the entry and returns the state it held.
    async fn remove_state(&self, service_instance_id: &str)
        -> Result<ServiceInstanceState, StateError>;
}

/// Operation state keyed by (service instance id, binding id).
#[async_trait]
pub trait ServiceInstanceBindingStateRepository: Send + Sync {
    async fn save_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
        state: OperationState,
        description: &str,
    ) -> Result<ServiceInstanceState, StateError>;

    async fn get_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
    ) -> Result<ServiceInstanceState, StateError>;

    async fn remove_state(
        &self,
        service_instance_id: &str,
        binding_id: &str,
    ) -> Result<ServiceInstanceState, StateError>;
}
