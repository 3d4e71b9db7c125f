//! Message model shared by every part of the runtime.
//!
//! - [`Message`] - one queued unit of work: source, session, type tag, payload
//! - [`MessageKind`] - the 8-bit payload type tag
//! - [`SendFlags`] - modifiers accepted by the send entry points
//! - [`pack`] / [`unpack`] - the combined size-and-type wire field

pub mod envelope;
pub mod kind;

pub use envelope::{pack, unpack, Message, MAX_PAYLOAD};
pub use kind::{MessageKind, SendFlags};
