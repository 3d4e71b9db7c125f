// Layer 1: Standard library imports
use std::fmt::{self, Debug};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::kind::MessageKind;
use crate::util::Handle;

/// Largest payload a single message may carry, in bytes.
///
/// The limit exists so the payload size and the type tag share one 32-bit
/// field on the wire: 24 bits of size, 8 bits of tag.
pub const MAX_PAYLOAD: usize = (1 << 24) - 1;

const KIND_SHIFT: u32 = 24;
const SIZE_MASK: u32 = (1 << KIND_SHIFT) - 1;

/// Combine a type tag and a payload size into the shared wire field.
///
/// Sizes above [`MAX_PAYLOAD`] are truncated to their low 24 bits; callers
/// validate the size before packing.
pub const fn pack(kind: MessageKind, size: u32) -> u32 {
    ((kind.raw() as u32) << KIND_SHIFT) | (size & SIZE_MASK)
}

/// Split a packed wire field back into its type tag and payload size.
pub const fn unpack(field: u32) -> (MessageKind, u32) {
    (
        MessageKind::from_raw((field >> KIND_SHIFT) as u8),
        field & SIZE_MASK,
    )
}

/// One queued unit of work for a service.
///
/// Ownership of the payload moves with the message: into the mailbox on
/// enqueue, into the callback on dispatch. A callback that wants to keep
/// the bytes simply keeps them; dropping the message frees them.
pub struct Message {
    /// Handle of the sending service, or [`Handle::ZERO`] for anonymous
    /// runtime traffic.
    pub source: Handle,
    /// Correlation tag chosen by the sender; positive when a reply is
    /// expected, zero otherwise.
    pub session: i32,
    /// Payload type tag.
    pub kind: MessageKind,
    /// Payload bytes, if any.
    pub payload: Option<Box<[u8]>>,
}

impl Message {
    /// Payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.as_ref().map_or(0, |p| p.len())
    }

    /// The combined size-and-type field this message carries on the wire.
    pub fn packed_field(&self) -> u32 {
        pack(self.kind, self.size() as u32)
    }
}

impl Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("source", &self.source.to_string())
            .field("session", &self.session)
            .field("kind", &self.kind.raw())
            .field("size", &self.size())
            .finish()
    }
}
