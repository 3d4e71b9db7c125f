//! Service contexts and the pluggable module surface.
//!
//! - [`ServiceContext`] - one live service: module instance, callback,
//!   mailbox, session counter, stats
//! - [`Module`] / [`Instance`] - the entry points a loadable unit exposes
//! - [`ModuleRegistry`] - in-process name→factory table
//!
//! Dynamic-library loading itself lives outside this crate; hosts install
//! their factories here by name and the launch path does the rest.

pub mod context;
pub(crate) mod log;
pub mod module;

pub use context::{CallbackFn, ServiceContext};
pub use module::{BoxError, DuplicateModule, Instance, Module, ModuleRegistry};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::context::ServiceContext;
    use super::module::{BoxError, Instance};
    use crate::system::Node;

    struct NullInstance;

    impl Instance for NullInstance {
        fn init(
            &mut self,
            _node: &Node,
            _ctx: &Arc<ServiceContext>,
            _param: Option<&str>,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    /// An instance with no state, no callback, and a successful init.
    pub(crate) fn null_instance() -> Box<dyn Instance> {
        Box::new(NullInstance)
    }
}
