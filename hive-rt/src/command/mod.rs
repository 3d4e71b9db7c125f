//! The in-process text command surface.
//!
//! Services drive the runtime by name: `REG`, `QUERY`, `NAME`, `TIMEOUT`,
//! `EXIT`, `KILL`, `LAUNCH`, `GETENV`, `SETENV`, `STARTTIME`, `ABORT`,
//! `MONITOR`, `STAT`, `LOGON`, `LOGOFF`, `SIGNAL`. Parameters and results
//! are text; handle parameters accept either the `:hex` or the `.name`
//! form. Unknown commands yield `None`.

pub mod surface;

pub use surface::execute;
