// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use thiserror::Error;

// Layer 3: Internal module imports
use crate::message::{Message, MAX_PAYLOAD};
use crate::registry::RegistryError;
use crate::service::BoxError;
use crate::util::Handle;

/// Failures raised by the send surface.
///
/// Whatever payload the caller handed in has been dropped by the time an
/// error comes back, except for [`PushError`] which returns the message to
/// its caller.
#[derive(Debug, Error)]
pub enum SendError {
    /// The destination handle does not resolve to a live service.
    #[error("destination {0} does not resolve to a live service")]
    UnknownHandle(Handle),

    /// The `.name` (or `:hex`) destination text does not resolve.
    #[error("destination `{0}` does not resolve")]
    UnknownName(String),

    /// The payload exceeds the 24-bit size field.
    #[error("payload of {size} bytes exceeds the {}-byte limit", MAX_PAYLOAD)]
    PayloadTooLarge {
        /// Size of the rejected payload.
        size: usize,
    },

    /// ALLOC_SESSION was requested together with a nonzero session.
    #[error("session must be 0 when ALLOC_SESSION is requested")]
    SessionNotZero,

    /// ALLOC_SESSION was requested without a sending context to allocate
    /// from.
    #[error("ALLOC_SESSION requires a sending context")]
    NoContext,

    /// The destination lives on another node and no harbor is installed.
    #[error("no harbor transport installed for remote destination")]
    NoHarbor,
}

/// A direct mailbox push found no live destination. Ownership of the
/// message stays with the caller, who decides whether to drop it or route
/// it elsewhere.
#[derive(Debug, Error)]
#[error("destination does not resolve to a live service")]
pub struct PushError(pub Message);

/// Failures raised while launching a new service.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// No module is installed under the requested name.
    #[error("module `{0}` is not installed")]
    UnknownModule(String),

    /// The module's `create` entry point failed.
    #[error("service creation failed")]
    Create(#[source] BoxError),

    /// The instance's `init` entry point failed; the half-built service
    /// has been retired and its queued messages answered with ERROR.
    #[error("service init failed")]
    Init(#[source] BoxError),

    /// Handle allocation failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
