//! The worker dispatch engine.
//!
//! - [`dispatch`] - one scheduling step: own a mailbox, drain a weighted
//!   batch, hand the mailbox on
//! - [`WorkerPool`] - the fixed thread pool driving [`dispatch`] plus the
//!   watchdog thread
//! - [`WorkerMonitor`] - per-worker progress slot the watchdog samples to
//!   spot callbacks that never return

pub mod monitor;
pub mod worker;

pub use monitor::WorkerMonitor;
pub use worker::{dispatch, weight_for, WorkerPool};

pub(crate) use worker::deliver;
