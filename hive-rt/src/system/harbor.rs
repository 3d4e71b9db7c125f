// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::message::MessageKind;
use crate::util::Handle;

/// Where a remote message is going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteDestination {
    /// A fully qualified handle on another node.
    Handle(Handle),
    /// A global name to be resolved by the transport. Names longer than 15
    /// non-space ASCII characters do not fit the wire form; transports
    /// reject them.
    Named(String),
}

/// One message leaving this node.
#[derive(Debug)]
pub struct RemoteMessage {
    /// Destination node-side address.
    pub destination: RemoteDestination,
    /// Payload type tag.
    pub kind: MessageKind,
    /// Payload bytes, if any.
    pub payload: Option<Box<[u8]>>,
}

/// The inter-node transport collaborator.
///
/// The node hands over every outbound message whose destination's node id
/// is neither zero nor its own. Inbound traffic flows the other way: the
/// transport injects it with [`Node::push`](crate::Node::push).
pub trait Harbor: Send + Sync + 'static {
    /// Ship one message. Delivery is fire-and-forget from the node's point
    /// of view; transport failures come back, if at all, as ERROR messages
    /// to `source` with the same `session`.
    fn send(&self, message: RemoteMessage, source: Handle, session: i32);
}
