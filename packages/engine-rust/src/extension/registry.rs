use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use appbroker_core::{ExtensionArgs, ExtensionSpec};
use serde::de::DeserializeOwned;

use super::args::bind_config;
use super::ExtensionError;

// ---------------------------------------------------------------------------
// ExtensionFactory trait
// ---------------------------------------------------------------------------

/// Factory producing a configured extension of kind `Extension`.
///
/// Each resolution binds a brand-new `Config` from the caller's arguments,
/// so factories themselves hold only wiring (collaborators, fixed limits)
/// and never per-request state.
pub trait ExtensionFactory: Send + Sync + 'static {
    /// The extension interface produced, e.g. `dyn Target`.
    type Extension: ?Sized + Send + Sync;
    /// Typed configuration bound from the untyped catalog arguments.
    type Config: DeserializeOwned;

    /// Returns the unique name this factory is registered under.
    fn name(&self) -> &'static str;

    /// Builds an extension instance from a freshly bound configuration.
    fn create(&self, config: Self::Config) -> Arc<Self::Extension>;
}

/// Object-safe view of an [`ExtensionFactory`], erasing its `Config` type.
trait ErasedFactory<E: ?Sized>: Send + Sync {
    fn create_from_args(&self, args: &ExtensionArgs) -> Result<Arc<E>, ExtensionError>;
}

impl<F: ExtensionFactory> ErasedFactory<F::Extension> for F {
    fn create_from_args(&self, args: &ExtensionArgs) -> Result<Arc<F::Extension>, ExtensionError> {
        let config = bind_config::<F::Config>(self.name(), args)?;
        Ok(self.create(config))
    }
}

// ---------------------------------------------------------------------------
// ExtensionRegistry
// ---------------------------------------------------------------------------

/// Immutable name -> factory index for one extension kind.
///
/// Built once at startup through [`ExtensionRegistry::builder`]; afterwards
/// it is only read, so it can be shared behind an `Arc` and resolved from
/// any number of tasks without locking.
pub struct ExtensionRegistry<E: ?Sized> {
    factories: HashMap<&'static str, Box<dyn ErasedFactory<E>>>,
}

impl<E: ?Sized + Send + Sync + 'static> ExtensionRegistry<E> {
    /// Starts collecting factories for a new registry.
    #[must_use]
    pub fn builder() -> ExtensionRegistryBuilder<E> {
        ExtensionRegistryBuilder {
            factories: Vec::new(),
        }
    }

    /// Resolves the extension registered under `name`, configured from `args`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::Unknown`] (listing the registered names) if no
    /// factory has that name, or [`ExtensionError::InvalidConfiguration`] if
    /// `args` cannot be bound onto the factory's configuration.
    pub fn resolve(&self, name: &str, args: &ExtensionArgs) -> Result<Arc<E>, ExtensionError> {
        let factory = self.factories.get(name).ok_or_else(|| ExtensionError::Unknown {
            name: name.to_string(),
            known: self.names().into_iter().map(String::from).collect(),
        })?;
        factory.create_from_args(args)
    }

    /// Resolves an [`ExtensionSpec`] taken from the catalog.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_spec(&self, spec: &ExtensionSpec) -> Result<Arc<E>, ExtensionError> {
        self.resolve(&spec.name, &spec.args)
    }

    /// Registered names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<E: ?Sized + Send + Sync + 'static> fmt::Debug for ExtensionRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ExtensionRegistryBuilder
// ---------------------------------------------------------------------------

/// Collects factories in registration order; duplicates are detected in `build`.
pub struct ExtensionRegistryBuilder<E: ?Sized> {
    factories: Vec<(&'static str, Box<dyn ErasedFactory<E>>)>,
}

impl<E: ?Sized + Send + Sync + 'static> ExtensionRegistryBuilder<E> {
    /// Adds a factory.
    #[must_use]
    pub fn register<F>(mut self, factory: F) -> Self
    where
        F: ExtensionFactory<Extension = E>,
    {
        self.factories.push((factory.name(), Box::new(factory)));
        self
    }

    /// Builds the name index.
    ///
    /// # Errors
    ///
    /// Returns [`ExtensionError::DuplicateName`] for the first name reported
    /// by more than one factory.
    pub fn build(self) -> Result<ExtensionRegistry<E>, ExtensionError> {
        let mut factories = HashMap::with_capacity(self.factories.len());
        for (name, factory) in self.factories {
            if factories.insert(name, factory).is_some() {
                return Err(ExtensionError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }
        Ok(ExtensionRegistry { factories })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
