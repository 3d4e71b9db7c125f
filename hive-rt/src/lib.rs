//! # hive-rt - Per-Node Actor Service Runtime
//!
//! The scheduling core of an actor-based service framework: many lightweight
//! services multiplexed onto a small fixed pool of worker threads, addressed
//! by 32-bit handles and wired together with asynchronous messages.
//!
//! # Quick Start
//!
//! ```rust
//! use hive_rt::{
//!     BoxError, Instance, Message, MessageKind, Module, Node, NodeConfig, SendFlags,
//!     ServiceContext,
//! };
//! use std::sync::Arc;
//!
//! // 1. Define a module: the factory a service is launched from.
//! struct Echo;
//!
//! impl Module for Echo {
//!     fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
//!         Ok(Box::new(EchoInstance))
//!     }
//! }
//!
//! // 2. Define the instance; init binds the message callback.
//! struct EchoInstance;
//!
//! impl Instance for EchoInstance {
//!     fn init(
//!         &mut self,
//!         _node: &Node,
//!         ctx: &Arc<ServiceContext>,
//!         _param: Option<&str>,
//!     ) -> Result<(), BoxError> {
//!         ctx.bind_callback(|node, ctx, message: Message| {
//!             // Reply to the sender with the same payload and session.
//!             let _ = node.send(
//!                 Some(ctx),
//!                 hive_rt::Handle::ZERO,
//!                 message.source,
//!                 MessageKind::RESPONSE,
//!                 SendFlags::empty(),
//!                 message.session,
//!                 message.payload,
//!             );
//!         });
//!         Ok(())
//!     }
//! }
//!
//! // 3. Build a node, install the module, launch a service.
//! let node = Node::new(NodeConfig::default());
//! node.modules().install("echo", Arc::new(Echo)).unwrap();
//! let echo = node.launch("echo", None).unwrap();
//! assert_eq!(echo.handle().to_string(), ":00000001");
//! ```
//!
//! Run [`WorkerPool::start`] to drive the node with the configured worker
//! threads, or call [`dispatch`] yourself to embed a custom worker loop.
//!
//! # Architecture
//!
//! ```text
//! send ──► Registry (handle → context) ──► Mailbox ──► GlobalQueue
//!                                                          │
//!             Workers pop a mailbox, drain a weighted batch,│
//!             invoke the service callback, requeue ◄────────┘
//! ```
//!
//! - **One service, one thread at a time.** A mailbox is owned by at most
//!   one worker at any instant, enforced structurally by the `in_global`
//!   linking flag. Callbacks never need their own locking for service
//!   state.
//! - **FIFO per sender.** Messages from one service to another arrive in
//!   send order.
//! - **Weighted batching.** Workers drain one message or a fraction of the
//!   backlog per visit depending on their weight class, trading latency
//!   against throughput across the pool.
//! - **Advisory overload and stuck detection.** An unbounded mailbox logs
//!   when it crosses a doubling threshold; the watchdog thread flags
//!   callbacks that have not returned within the configured threshold.
//! - **Explicit node object.** No process globals; tests run several nodes
//!   side by side.
//!
//! # Module Organization
//!
//! - [`message`] - message model, type tags, the packed size/type field
//! - [`mailbox`] - per-service queues and the global ready queue
//! - [`registry`] - handle allocation, lookup, `.name` aliases
//! - [`service`] - service contexts and the pluggable module surface
//! - [`dispatch`] - the worker dispatch loop, pool, and watchdog
//! - [`command`] - the in-process text command surface
//! - [`system`] - the node object, configuration, collaborator traits
//! - [`util`] - handles and small shared helpers

pub mod command;
pub mod dispatch;
pub mod mailbox;
pub mod message;
pub mod registry;
pub mod service;
pub mod system;
pub mod util;

// Re-export commonly used types
pub use dispatch::{dispatch, weight_for, WorkerMonitor, WorkerPool};
pub use mailbox::{GlobalQueue, Mailbox};
pub use message::{pack, unpack, Message, MessageKind, SendFlags, MAX_PAYLOAD};
pub use registry::{Registry, RegistryError};
pub use service::{BoxError, DuplicateModule, Instance, Module, ModuleRegistry, ServiceContext};
pub use system::{
    current_handle, Harbor, LaunchError, Node, NodeConfig, NodeConfigBuilder, PushError,
    RemoteDestination, RemoteMessage, SendError, TimerDriver,
};
pub use util::{Handle, ParseHandleError};
