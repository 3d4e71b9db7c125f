// Layer 1: Standard library imports
use std::sync::atomic::{AtomicU32, Ordering};

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::system::Node;
use crate::util::Handle;

/// Progress slot one worker shares with the watchdog thread.
///
/// The worker writes `(source, destination)` and bumps `version` around
/// every callback. The watchdog samples the slot out of band: a version
/// that has not moved between two samples while a destination is recorded
/// means a callback has been running for at least one full check interval,
/// and the destination context is flagged as endless. Purely advisory; the
/// dispatcher never preempts.
#[derive(Default)]
pub struct WorkerMonitor {
    source: AtomicU32,
    destination: AtomicU32,
    version: AtomicU32,
    check_version: AtomicU32,
}

impl WorkerMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the dispatch about to run (or, with zero handles, that the
    /// previous one finished).
    pub(crate) fn trigger(&self, source: Handle, destination: Handle) {
        self.source.store(source.raw(), Ordering::Relaxed);
        self.destination.store(destination.raw(), Ordering::Relaxed);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// One watchdog sample. Flags the recorded destination when the slot
    /// has not advanced since the previous sample.
    pub(crate) fn check(&self, node: &Node) {
        let version = self.version.load(Ordering::Acquire);
        if version == self.check_version.load(Ordering::Relaxed) {
            let destination = Handle::from_raw(self.destination.load(Ordering::Relaxed));
            if !destination.is_zero() {
                let source = Handle::from_raw(self.source.load(Ordering::Relaxed));
                node.mark_endless(destination);
                node.emit_log(
                    Handle::ZERO,
                    format!(
                        "A message from [ {source} ] to [ {destination} ] maybe in an endless loop (version = {version})"
                    ),
                );
            }
        } else {
            self.check_version.store(version, Ordering::Relaxed);
        }
    }
}
