// Layer 1: Standard library imports
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

// Layer 2: Third-party crate imports
use parking_lot::Mutex;

// Layer 3: Internal module imports
use super::log::LogSink;
use super::module::Instance;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::system::node::NodeStats;
use crate::system::Node;
use crate::util::Handle;

/// Message callback bound by a service during init.
///
/// The callback owns each message it is handed; keeping the payload is how
/// a service retains it, dropping the message frees it.
pub type CallbackFn = dyn FnMut(&Node, &Arc<ServiceContext>, Message) + Send;

/// The callback slot: explicitly either unbound or bound, never a null
/// function pointer.
pub(crate) enum Callback {
    Unbound,
    Bound(Box<CallbackFn>),
}

/// One live service: the binding between a module instance, its mailbox,
/// its handle, and its runtime accounting.
///
/// Shared ownership is the point. The registry slot holds one strong
/// reference for as long as the handle resolves; lookups clone a second,
/// short-lived one. When the last reference drops, teardown runs: the
/// module instance is released, the mailbox is marked for destruction, and
/// the node's live count falls. The mailbox itself outlives the context
/// until a worker observes it released and empty.
pub struct ServiceContext {
    handle: AtomicU32,
    module: Box<str>,
    instance: Mutex<Option<Box<dyn Instance>>>,
    callback: Mutex<Callback>,
    mailbox: Arc<Mailbox>,
    session: AtomicI32,
    init_done: AtomicBool,
    endless: AtomicBool,
    profile: AtomicBool,
    reserved: AtomicBool,
    message_count: AtomicU64,
    cpu_cost: AtomicU64,
    cpu_start: AtomicU64,
    log_sink: Mutex<Option<LogSink>>,
    stats: Arc<NodeStats>,
}

impl ServiceContext {
    pub(crate) fn new(
        module: &str,
        instance: Box<dyn Instance>,
        mailbox: Arc<Mailbox>,
        stats: Arc<NodeStats>,
        profile: bool,
    ) -> Arc<Self> {
        stats.context_created();
        Arc::new(ServiceContext {
            handle: AtomicU32::new(0),
            module: module.into(),
            instance: Mutex::new(Some(instance)),
            callback: Mutex::new(Callback::Unbound),
            mailbox,
            session: AtomicI32::new(0),
            init_done: AtomicBool::new(false),
            endless: AtomicBool::new(false),
            profile: AtomicBool::new(profile),
            reserved: AtomicBool::new(false),
            message_count: AtomicU64::new(0),
            cpu_cost: AtomicU64::new(0),
            cpu_start: AtomicU64::new(0),
            log_sink: Mutex::new(None),
            stats,
        })
    }

    /// Handle assigned at registration; [`Handle::ZERO`] before that.
    pub fn handle(&self) -> Handle {
        Handle::from_raw(self.handle.load(Ordering::Acquire))
    }

    /// Stamp the assigned handle. Called once by the registry, under its
    /// write lock, before the context becomes visible to lookups.
    pub(crate) fn bind_handle(&self, handle: Handle) {
        self.handle.store(handle.raw(), Ordering::Release);
    }

    /// Name of the module this service was launched from.
    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub(crate) fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    /// Bind the message callback. Services call this from `init`; calling
    /// it again later replaces the callback from the next message on.
    pub fn bind_callback<F>(&self, callback: F)
    where
        F: FnMut(&Node, &Arc<ServiceContext>, Message) + Send + 'static,
    {
        *self.callback.lock() = Callback::Bound(Box::new(callback));
    }

    /// Whether a callback is currently bound.
    pub fn has_callback(&self) -> bool {
        matches!(*self.callback.lock(), Callback::Bound(_))
    }

    /// Detach the callback for invocation. The dispatcher owns it for the
    /// duration of the call, which is what makes a reentrant dispatch (or
    /// a rebind from inside the callback) safe instead of self-deadlocking.
    pub(crate) fn take_callback(&self) -> Callback {
        std::mem::replace(&mut *self.callback.lock(), Callback::Unbound)
    }

    /// Re-attach a callback taken by [`Self::take_callback`], unless the
    /// service bound a replacement while it was out.
    pub(crate) fn restore_callback(&self, callback: Callback) {
        let mut slot = self.callback.lock();
        if matches!(*slot, Callback::Unbound) {
            *slot = callback;
        }
    }

    /// Allocate the next session id for this service.
    ///
    /// Sessions are always strictly positive; the counter wraps back to 1
    /// past `i32::MAX`.
    pub fn new_session(&self) -> i32 {
        let session = self.session.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if session <= 0 {
            self.session.store(1, Ordering::Relaxed);
            return 1;
        }
        session
    }

    #[cfg(test)]
    pub(crate) fn set_session_counter(&self, value: i32) {
        self.session.store(value, Ordering::Relaxed);
    }

    /// Run the module's init hook, with the instance temporarily detached
    /// so the hook can reach back into the context (bind the callback,
    /// run commands) without holding the instance lock.
    pub(crate) fn run_init(
        ctx: &Arc<Self>,
        node: &Node,
        param: Option<&str>,
    ) -> Result<(), super::module::BoxError> {
        let mut instance = ctx.instance.lock().take();
        let result = match instance.as_mut() {
            Some(instance) => instance.init(node, ctx, param),
            None => Ok(()),
        };
        *ctx.instance.lock() = instance;
        result
    }

    /// Deliver an out-of-band signal to the module instance.
    pub(crate) fn signal(&self, signal: i32) {
        if let Some(instance) = self.instance.lock().as_ref() {
            instance.signal(signal);
        }
    }

    pub(crate) fn mark_init_done(&self) {
        self.init_done.store(true, Ordering::Release);
    }

    /// Whether init has completed successfully.
    pub fn initialized(&self) -> bool {
        self.init_done.load(Ordering::Acquire)
    }

    pub(crate) fn mark_endless(&self) {
        self.endless.store(true, Ordering::Relaxed);
    }

    /// Read and clear the stuck-callback advisory (STAT endless).
    pub(crate) fn take_endless(&self) -> bool {
        self.endless.swap(false, Ordering::Relaxed)
    }

    pub(crate) fn profile_enabled(&self) -> bool {
        self.profile.load(Ordering::Relaxed)
    }

    /// Exclude this context from the node's live count so shutdown can
    /// complete while a long-lived helper is still held. Idempotent.
    pub(crate) fn mark_reserved(&self) {
        if !self.reserved.swap(true, Ordering::AcqRel) {
            self.stats.context_destroyed();
        }
    }

    pub(crate) fn note_message(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Messages dispatched to this service so far.
    pub fn message_count(&self) -> u64 {
        self.message_count.load(Ordering::Relaxed)
    }

    pub(crate) fn set_cpu_start(&self, micros: u64) {
        self.cpu_start.store(micros, Ordering::Relaxed);
    }

    pub(crate) fn cpu_start_micros(&self) -> u64 {
        self.cpu_start.load(Ordering::Relaxed)
    }

    pub(crate) fn add_cpu_cost(&self, micros: u64) {
        self.cpu_cost.fetch_add(micros, Ordering::Relaxed);
    }

    /// Accumulated callback CPU time in microseconds (profiling only).
    pub fn cpu_cost_micros(&self) -> u64 {
        self.cpu_cost.load(Ordering::Relaxed)
    }

    /// Open the per-service message log. Returns `Ok(false)` when a sink
    /// is already open.
    pub(crate) fn open_log_sink(&self, dir: &Path) -> std::io::Result<bool> {
        let mut sink = self.log_sink.lock();
        if sink.is_some() {
            return Ok(false);
        }
        *sink = Some(LogSink::open(dir, self.handle().raw())?);
        Ok(true)
    }

    /// Close the per-service message log. Returns the closed file's path,
    /// or `None` when no sink was open.
    pub(crate) fn close_log_sink(&self) -> Option<std::path::PathBuf> {
        self.log_sink
            .lock()
            .take()
            .map(|sink| sink.path().to_path_buf())
    }

    pub(crate) fn record_log(&self, message: &Message) {
        if let Some(sink) = self.log_sink.lock().as_mut() {
            sink.record(message);
        }
    }
}

impl Drop for ServiceContext {
    fn drop(&mut self) {
        // Close the log sink and release the module instance first, then
        // publish the mailbox release flag; only after the flag is out does
        // the live count fall. Shutdown waits on that count, so a released
        // mailbox is always observable by the time the count reaches zero.
        self.log_sink.get_mut().take();
        self.instance.get_mut().take();
        self.mailbox.mark_release();
        if !self.reserved.load(Ordering::Acquire) {
            self.stats.context_destroyed();
        }
    }
}
