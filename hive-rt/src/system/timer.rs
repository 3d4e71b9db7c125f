// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::util::Handle;

/// The timer collaborator behind the TIMEOUT command.
pub trait TimerDriver: Send + Sync + 'static {
    /// Arrange for a RESPONSE message carrying `session` to be delivered
    /// to `handle` after `centisecs` hundredths of a second. A zero delay
    /// fires on the driver's next tick.
    fn timeout(&self, handle: Handle, centisecs: i32, session: i32);
}
