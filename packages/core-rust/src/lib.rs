//! App broker core: backing applications, brokered service catalog, extension
//! specs, and operation state.

pub mod catalog;
pub mod state;
pub mod types;

pub use catalog::{BrokeredService, BrokeredServices, CatalogError};
pub use state::{BindingKey, OperationState, ServiceInstanceState};
pub use types::{
    ArtifactDetails, BackingApplication, BackingService, CredentialProviderSpec,
    DeployedApplication, ExtensionArgs, ExtensionSpec, Parameters, ParametersTransformerSpec,
    ServicesSpec, TargetSpec,
};
