//! Two-level message queueing.
//!
//! Every service owns one [`Mailbox`] holding its pending messages. A
//! mailbox that has work is linked into the node-wide [`GlobalQueue`], the
//! FIFO the worker threads feed from. The `in_global` flag on each mailbox
//! guarantees it is linked at most once, which in turn guarantees that at
//! most one worker drains a given service at any instant.

pub mod global;
pub mod queue;

pub use global::GlobalQueue;
pub use queue::Mailbox;
