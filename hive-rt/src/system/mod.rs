//! The node object: configuration, the messaging surface, and the traits
//! external collaborators plug into.
//!
//! - [`Node`] - one runtime instance; explicit object, no process globals
//! - [`NodeConfig`] - configuration with defaults, builder, validation
//! - [`Harbor`] / [`TimerDriver`] - collaborator traits
//! - [`SendError`] / [`LaunchError`] / [`PushError`] - failure surface

pub mod config;
pub(crate) mod env;
pub mod error;
pub mod harbor;
pub mod node;
pub mod timer;

pub use config::{NodeConfig, NodeConfigBuilder};
pub use error::{LaunchError, PushError, SendError};
pub use harbor::{Harbor, RemoteDestination, RemoteMessage};
pub use node::{current_handle, Node};
pub use timer::TimerDriver;
