// Layer 1: Standard library imports
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::global::GlobalQueue;
use crate::message::Message;
use crate::util::Handle;

/// Initial ring capacity of a fresh mailbox; growth is geometric from here.
pub(crate) const INITIAL_CAPACITY: usize = 64;

/// Queue length at which the overload advisory first fires. Each trip
/// doubles the threshold until the mailbox drains empty again.
pub(crate) const OVERLOAD_THRESHOLD: usize = 1024;

struct MailboxState {
    ring: VecDeque<Message>,
    /// Set while the mailbox is linked into the global queue or owned by a
    /// worker mid-drain. Guards the at-most-once linking invariant.
    in_global: bool,
    /// Published by the owning context on its way out; a released mailbox
    /// is destroyed by the next worker that sees it empty.
    release: bool,
    overload: usize,
    overload_threshold: usize,
}

/// FIFO of pending messages for one service.
///
/// A mailbox is born with `in_global` already set even though it is not yet
/// linked anywhere. Messages can therefore arrive while the owning service
/// is still initializing without the mailbox reaching a worker; the launch
/// path performs the one real linking after init completes. From then on
/// the flag tracks the linked state exactly.
pub struct Mailbox {
    me: Weak<Mailbox>,
    owner: AtomicU32,
    global: Arc<GlobalQueue>,
    state: Mutex<MailboxState>,
}

impl Mailbox {
    pub(crate) fn new(global: Arc<GlobalQueue>) -> Arc<Self> {
        Arc::new_cyclic(|me| Mailbox {
            me: me.clone(),
            owner: AtomicU32::new(0),
            global,
            state: Mutex::new(MailboxState {
                ring: VecDeque::with_capacity(INITIAL_CAPACITY),
                in_global: true,
                release: false,
                overload: 0,
                overload_threshold: OVERLOAD_THRESHOLD,
            }),
        })
    }

    /// Stamp the owning handle. Called once, while the owning context is
    /// registered and before the mailbox can reach any worker.
    pub(crate) fn bind_owner(&self, handle: Handle) {
        self.owner.store(handle.raw(), Ordering::Release);
    }

    /// Handle of the owning service.
    pub fn owner(&self) -> Handle {
        Handle::from_raw(self.owner.load(Ordering::Acquire))
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.state.lock().ring.len()
    }

    /// Whether no messages are pending.
    pub fn is_empty(&self) -> bool {
        self.state.lock().ring.is_empty()
    }

    fn link_into_global(&self) {
        if let Some(me) = self.me.upgrade() {
            self.global.push(me);
        }
    }

    /// Append a message. An idle mailbox links itself into the global
    /// queue so a worker will come around for it.
    pub(crate) fn push(&self, message: Message) {
        let mut state = self.state.lock();
        state.ring.push_back(message);
        if !state.in_global {
            state.in_global = true;
            self.link_into_global();
        }
    }

    /// Remove the message at the head.
    ///
    /// An empty pop clears `in_global` (a later push re-links) and resets
    /// the overload threshold. A non-empty pop arms the overload advisory
    /// when the remaining backlog exceeds the current threshold, doubling
    /// the threshold each trip so the advisory stays rare under sustained
    /// load.
    pub(crate) fn pop(&self) -> Option<Message> {
        let mut state = self.state.lock();
        match state.ring.pop_front() {
            Some(message) => {
                let backlog = state.ring.len();
                while backlog > state.overload_threshold {
                    state.overload = backlog;
                    state.overload_threshold *= 2;
                }
                Some(message)
            }
            None => {
                state.overload_threshold = OVERLOAD_THRESHOLD;
                state.in_global = false;
                None
            }
        }
    }

    /// Read and clear the overload advisory armed by [`Mailbox::pop`].
    pub(crate) fn overload(&self) -> Option<usize> {
        let mut state = self.state.lock();
        match state.overload {
            0 => None,
            length => {
                state.overload = 0;
                Some(length)
            }
        }
    }

    /// Publish that the owning context is gone. Linked under the mailbox
    /// lock so the next worker to own this mailbox runs the destruction
    /// path even if the mailbox was idle.
    pub(crate) fn mark_release(&self) {
        let mut state = self.state.lock();
        state.release = true;
        if !state.in_global {
            state.in_global = true;
            self.link_into_global();
        }
    }

    pub(crate) fn is_released(&self) -> bool {
        self.state.lock().release
    }

    /// Worker-side retirement of a mailbox whose owner no longer resolves.
    ///
    /// Until `release` is published the owning context may still be alive
    /// on another thread (the teardown race), so the mailbox is relinked
    /// for a later worker to retry. Once `release` is observed no producer
    /// can reach the mailbox again and the backlog is drained through
    /// `drop_message`, which reports delivery failure to each sender.
    pub(crate) fn destroy(&self, mut drop_message: impl FnMut(Message)) {
        if self.is_released() {
            while let Some(message) = self.pop() {
                drop_message(message);
            }
        } else {
            self.link_into_global();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn message(session: i32) -> Message {
        Message {
            source: Handle::new(0, 9),
            session,
            kind: MessageKind::TEXT,
            payload: None,
        }
    }

    /// Force a fresh mailbox out of its born-linked state, as the launch
    /// path does once init completes.
    fn force_link(global: &Arc<GlobalQueue>, mailbox: &Arc<Mailbox>) {
        global.push(Arc::clone(mailbox));
    }

    #[test]
    fn test_fifo() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        mailbox.push(message(1));
        mailbox.push(message(2));
        mailbox.push(message(3));
        assert_eq!(mailbox.len(), 3);
        assert_eq!(mailbox.pop().map(|m| m.session), Some(1));
        assert_eq!(mailbox.pop().map(|m| m.session), Some(2));
        assert_eq!(mailbox.pop().map(|m| m.session), Some(3));
        assert!(mailbox.pop().is_none());
    }

    #[test]
    fn test_born_linked_push_does_not_enqueue() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        mailbox.push(message(1));
        assert!(global.is_empty());
    }

    #[test]
    fn test_relink_after_drained_empty() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        force_link(&global, &mailbox);
        assert_eq!(global.len(), 1);
        global.pop();

        // Drain to empty: clears in_global.
        mailbox.push(message(1));
        assert!(global.is_empty());
        mailbox.pop();
        assert!(mailbox.pop().is_none());

        // The next push re-links exactly once.
        mailbox.push(message(2));
        mailbox.push(message(3));
        assert_eq!(global.len(), 1);
    }

    #[test]
    fn test_overload_advisory_trips_and_doubles() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        for i in 0..(OVERLOAD_THRESHOLD as i32 + 2) {
            mailbox.push(message(i));
        }

        // Backlog after this pop is 1025, above the 1024 threshold.
        mailbox.pop();
        assert_eq!(mailbox.overload(), Some(OVERLOAD_THRESHOLD + 1));
        // Advisory reads destructively.
        assert_eq!(mailbox.overload(), None);

        // Threshold doubled; popping a few more messages stays quiet.
        mailbox.pop();
        mailbox.pop();
        assert_eq!(mailbox.overload(), None);

        // Draining empty resets the threshold for the next episode.
        while mailbox.pop().is_some() {}
        for i in 0..(OVERLOAD_THRESHOLD as i32 + 2) {
            mailbox.push(message(i));
        }
        mailbox.pop();
        assert!(mailbox.overload().is_some());
    }

    #[test]
    fn test_mark_release_links_idle_mailbox() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        force_link(&global, &mailbox);
        global.pop();
        assert!(mailbox.pop().is_none()); // clears in_global

        mailbox.mark_release();
        assert!(mailbox.is_released());
        assert_eq!(global.len(), 1);
    }

    #[test]
    fn test_destroy_relinks_until_released() {
        let global = GlobalQueue::new();
        let mailbox = Mailbox::new(Arc::clone(&global));
        mailbox.push(message(7));

        // Owner not yet released: the mailbox survives and is relinked.
        let mut dropped = Vec::new();
        mailbox.destroy(|m| dropped.push(m.session));
        assert!(dropped.is_empty());
        assert_eq!(global.len(), 1);
        assert_eq!(mailbox.len(), 1);

        // Once released, the backlog is handed to the drop hook.
        global.pop();
        mailbox.mark_release();
        mailbox.destroy(|m| dropped.push(m.session));
        assert_eq!(dropped, vec![7]);
        assert!(mailbox.is_empty());
    }
}
