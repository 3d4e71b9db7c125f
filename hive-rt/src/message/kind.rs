// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Payload type tag carried in the high 8 bits of the packed wire field.
///
/// The runtime interprets only a handful of well-known tags; everything
/// above [`MessageKind::ERROR`] is free for applications to define.
///
/// # Example
///
/// ```rust
/// use hive_rt::MessageKind;
///
/// assert_eq!(MessageKind::RESPONSE.raw(), 1);
/// let custom = MessageKind::from_raw(11);
/// assert_ne!(custom, MessageKind::TEXT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKind(u8);

impl MessageKind {
    /// Plain text, including lines routed to the logger service.
    pub const TEXT: MessageKind = MessageKind(0);
    /// Reply matched to a previously allocated session (timer expiry included).
    pub const RESPONSE: MessageKind = MessageKind(1);
    /// Multicast fan-out payload.
    pub const MULTICAST: MessageKind = MessageKind(2);
    /// Data arriving on behalf of an external client connection.
    pub const CLIENT: MessageKind = MessageKind(3);
    /// Runtime-internal control traffic.
    pub const SYSTEM: MessageKind = MessageKind(4);
    /// Inter-node transport traffic.
    pub const HARBOR: MessageKind = MessageKind(5);
    /// Socket readiness and data notifications.
    pub const SOCKET: MessageKind = MessageKind(6);
    /// Delivery failure report; an empty ERROR reply tells a sender its
    /// destination died before answering.
    pub const ERROR: MessageKind = MessageKind(7);

    /// Build a tag from its raw 8-bit value.
    pub const fn from_raw(raw: u8) -> Self {
        MessageKind(raw)
    }

    /// The raw 8-bit value.
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// Modifiers accepted by [`Node::send`](crate::Node::send) alongside the
    /// type tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SendFlags: u32 {
        /// Allocate a fresh session from the sending context. The caller
        /// must pass `session = 0`; the allocated value is returned so the
        /// eventual RESPONSE can be matched to this request.
        const ALLOC_SESSION = 0x0002_0000;
    }
}
