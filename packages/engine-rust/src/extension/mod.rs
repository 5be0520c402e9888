//! Named, configurable extensions.
//!
//! Every pluggable strategy in the engine (targets, parameter transformers,
//! credential providers) is produced by an [`ExtensionFactory`] registered
//! under a unique name in an [`ExtensionRegistry`]. Resolution binds the
//! untyped arguments from the catalog onto the factory's typed configuration
//! (see [`args`]) and returns a fresh extension instance.

pub mod args;
pub mod registry;

pub use args::{bind_config, canonical_key, EmptyConfig};
pub use registry::{ExtensionFactory, ExtensionRegistry, ExtensionRegistryBuilder};

/// Errors raised while building a registry or resolving an extension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtensionError {
    #[error("unknown extension '{name}' (registered: {})", known.join(", "))]
    Unknown { name: String, known: Vec<String> },
    #[error("extension '{name}' is registered more than once")]
    DuplicateName { name: String },
    #[error("invalid configuration for extension '{name}': {reason}")]
    InvalidConfiguration { name: String, reason: String },
}
