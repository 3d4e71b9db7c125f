// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use parking_lot::{Condvar, Mutex};

// Layer 3: Internal module imports
use super::queue::Mailbox;

/// Node-wide FIFO of mailboxes that currently have work.
///
/// Producers are the mailbox push path (a mailbox links itself when it goes
/// from empty to non-empty) and the context teardown path; consumers are
/// the worker threads. A single coarse lock is enough here because workers
/// drain a whole batch per pop, so the queue itself sees little traffic.
pub struct GlobalQueue {
    ready: Mutex<VecDeque<Arc<Mailbox>>>,
    available: Condvar,
}

impl GlobalQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(GlobalQueue {
            ready: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        })
    }

    /// Link a mailbox at the tail and wake one parked worker.
    ///
    /// Callers are responsible for the at-most-once invariant: a mailbox is
    /// only handed here while its `in_global` flag transitions to set, or
    /// by the worker that currently owns it.
    pub(crate) fn push(&self, mailbox: Arc<Mailbox>) {
        self.ready.lock().push_back(mailbox);
        self.available.notify_one();
    }

    /// Unlink and return the mailbox at the head, if any.
    pub(crate) fn pop(&self) -> Option<Arc<Mailbox>> {
        self.ready.lock().pop_front()
    }

    /// Park the calling worker until a mailbox is linked or the timeout
    /// elapses. Spurious wakeups are fine; callers loop.
    pub(crate) fn wait(&self, timeout: Duration) {
        let mut ready = self.ready.lock();
        if ready.is_empty() {
            self.available.wait_for(&mut ready, timeout);
        }
    }

    /// Wake every parked worker (shutdown path).
    pub(crate) fn notify_all(&self) {
        self.available.notify_all();
    }

    /// Number of mailboxes currently linked.
    pub fn len(&self) -> usize {
        self.ready.lock().len()
    }

    /// Whether no mailbox is currently linked.
    pub fn is_empty(&self) -> bool {
        self.ready.lock().is_empty()
    }

    /// Drop every linked mailbox (node teardown; breaks the queue→mailbox
    /// reference cycle for mailboxes no worker will ever visit).
    pub(crate) fn clear(&self) {
        self.ready.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Handle;
    use std::time::Instant;

    #[test]
    fn test_fifo_order() {
        let global = GlobalQueue::new();
        let a = Mailbox::new(Arc::clone(&global));
        let b = Mailbox::new(Arc::clone(&global));
        a.bind_owner(Handle::new(0, 1));
        b.bind_owner(Handle::new(0, 2));

        global.push(Arc::clone(&a));
        global.push(Arc::clone(&b));
        assert_eq!(global.len(), 2);

        assert_eq!(global.pop().map(|m| m.owner()), Some(Handle::new(0, 1)));
        assert_eq!(global.pop().map(|m| m.owner()), Some(Handle::new(0, 2)));
        assert!(global.pop().is_none());
        assert!(global.is_empty());
    }

    #[test]
    fn test_wait_times_out_when_idle() {
        let global = GlobalQueue::new();
        let start = Instant::now();
        global.wait(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_wait_returns_when_work_arrives() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        mailbox.bind_owner(Handle::new(0, 3));

        let waiter = {
            let global = Arc::clone(&global);
            std::thread::spawn(move || {
                global.wait(Duration::from_secs(5));
            })
        };
        std::thread::sleep(Duration::from_millis(10));
        global.push(mailbox);
        waiter.join().ok();
        assert_eq!(global.len(), 1);
    }
}
