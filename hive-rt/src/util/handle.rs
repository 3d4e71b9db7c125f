// Layer 1: Standard library imports
use std::fmt::{self, Display};
use std::str::FromStr;

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Number of bits reserved for the local service id.
pub const NODE_SHIFT: u32 = 24;

/// Mask selecting the local service id out of a raw handle.
pub const LOCAL_MASK: u32 = (1 << NODE_SHIFT) - 1;

/// Address of one service within a cluster of nodes.
///
/// The high 8 bits name the node the service lives on (node id `0` is
/// reserved for "this node"); the low 24 bits identify the service within
/// that node. The zero handle is never assigned and acts as the "no
/// service" value throughout the messaging surface.
///
/// # Text form
///
/// A handle renders as `:` followed by exactly 8 uppercase hex digits and
/// parses back from the same shape (shorter hex runs are accepted on input).
///
/// # Example
///
/// ```rust
/// use hive_rt::Handle;
///
/// let h = Handle::new(0, 42);
/// assert_eq!(h.to_string(), ":0000002A");
/// assert_eq!(":0000002A".parse::<Handle>().ok(), Some(h));
/// assert_eq!(h.node(), 0);
/// assert_eq!(h.local(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u32);

impl Handle {
    /// The reserved "no service" handle.
    pub const ZERO: Handle = Handle(0);

    /// Build a handle from a node id and a local service id.
    ///
    /// The local id is truncated to its low 24 bits.
    pub const fn new(node: u8, local: u32) -> Self {
        Handle(((node as u32) << NODE_SHIFT) | (local & LOCAL_MASK))
    }

    /// Reconstruct a handle from its raw 32-bit form.
    pub const fn from_raw(raw: u32) -> Self {
        Handle(raw)
    }

    /// The raw 32-bit form.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// The node id carried in the high 8 bits.
    pub const fn node(self) -> u8 {
        (self.0 >> NODE_SHIFT) as u8
    }

    /// The local service id carried in the low 24 bits.
    pub const fn local(self) -> u32 {
        self.0 & LOCAL_MASK
    }

    /// Whether this is the reserved "no service" handle.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{:08X}", self.0)
    }
}

/// Failure parsing a handle from its `:XXXXXXXX` text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed handle literal `{0}`")]
pub struct ParseHandleError(pub String);

impl FromStr for Handle {
    type Err = ParseHandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix(':').unwrap_or(s);
        if digits.is_empty() || digits.len() > 8 {
            return Err(ParseHandleError(s.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Handle)
            .map_err(|_| ParseHandleError(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_node_and_local_split() {
        let h = Handle::new(7, 0x00AB_CDEF);
        assert_eq!(h.node(), 7);
        assert_eq!(h.local(), 0x00AB_CDEF);
        assert_eq!(h.raw(), 0x07AB_CDEF);
    }

    #[test]
    fn test_local_id_truncated() {
        let h = Handle::new(1, 0xFFFF_FFFF);
        assert_eq!(h.local(), LOCAL_MASK);
        assert_eq!(h.node(), 1);
    }

    #[test]
    fn test_zero_handle() {
        assert!(Handle::ZERO.is_zero());
        assert!(!Handle::new(0, 1).is_zero());
    }

    #[test]
    fn test_display_is_eight_uppercase_hex_digits() {
        assert_eq!(Handle::new(0, 1).to_string(), ":00000001");
        assert_eq!(Handle::new(0xFF, LOCAL_MASK).to_string(), ":FFFFFFFF");
    }

    #[test]
    fn test_parse_round_trip() {
        let h = Handle::new(3, 0x123456);
        let parsed: Handle = h.to_string().parse().unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn test_parse_accepts_short_and_lowercase() {
        assert_eq!(":2a".parse::<Handle>().unwrap(), Handle::new(0, 42));
        assert_eq!("2A".parse::<Handle>().unwrap(), Handle::new(0, 42));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(":".parse::<Handle>().is_err());
        assert!(":zz".parse::<Handle>().is_err());
        assert!(":123456789".parse::<Handle>().is_err());
        assert!("".parse::<Handle>().is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let h = Handle::new(0, 42);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, "42");
        let back: Handle = serde_json::from_str(&json).unwrap();
        assert_eq!(back, h);
    }
}
