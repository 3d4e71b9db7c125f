// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

// Layer 3: Internal module imports
use super::context::ServiceContext;
use crate::system::Node;

/// Boxed error type carried out of module entry points.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A loadable unit of service code.
///
/// One module backs any number of running services; each launch asks the
/// module for a fresh [`Instance`] holding that service's private state.
pub trait Module: Send + Sync + 'static {
    /// Instantiate private state for one new service.
    ///
    /// Stateless modules return a unit-like instance. An error here aborts
    /// the launch before a handle is assigned.
    fn create(&self) -> Result<Box<dyn Instance>, BoxError>;
}

/// One live instance created by a [`Module`].
pub trait Instance: Send + 'static {
    /// Called exactly once, before any message is dispatched.
    ///
    /// An instance that wants to receive messages must bind its callback
    /// through [`ServiceContext::bind_callback`] before returning `Ok`.
    /// Returning an error retires the half-built service; anything already
    /// queued for it is answered with an ERROR reply.
    fn init(
        &mut self,
        node: &Node,
        ctx: &Arc<ServiceContext>,
        param: Option<&str>,
    ) -> Result<(), BoxError>;

    /// Out-of-band control signal, delivered by the SIGNAL command.
    ///
    /// May be called from any thread, including while the message callback
    /// is running; implementations must be thread-safe. The default does
    /// nothing.
    fn signal(&self, _signal: i32) {}
}

/// A module name was installed twice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("module `{0}` is already installed")]
pub struct DuplicateModule(pub String);

/// In-process table of installed modules, keyed by launch name.
pub struct ModuleRegistry {
    modules: DashMap<String, Arc<dyn Module>>,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        ModuleRegistry {
            modules: DashMap::new(),
        }
    }

    /// Install a module factory under `name`.
    pub fn install(
        &self,
        name: impl Into<String>,
        module: Arc<dyn Module>,
    ) -> Result<(), DuplicateModule> {
        let name = name.into();
        match self.modules.entry(name) {
            Entry::Occupied(occupied) => Err(DuplicateModule(occupied.key().clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(module);
                Ok(())
            }
        }
    }

    /// Look up an installed module.
    pub fn query(&self, name: &str) -> Option<Arc<dyn Module>> {
        self.modules.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of installed modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module has been installed.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
