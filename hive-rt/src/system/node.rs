//! The node object: one runtime instance and its messaging surface.

// Layer 1: Standard library
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

// Layer 2: Third-party
use chrono::Utc;
use parking_lot::RwLock;

// Layer 3: Internal
use super::config::NodeConfig;
use super::env::Env;
use super::error::{LaunchError, PushError, SendError};
use super::harbor::{Harbor, RemoteDestination, RemoteMessage};
use super::timer::TimerDriver;
use crate::mailbox::{GlobalQueue, Mailbox};
use crate::message::{Message, MessageKind, SendFlags, MAX_PAYLOAD};
use crate::registry::Registry;
use crate::service::{ModuleRegistry, ServiceContext};
use crate::util::Handle;

thread_local! {
    static CURRENT_HANDLE: Cell<u32> = const { Cell::new(0) };
}

/// Handle of the service currently dispatching on this thread, or
/// [`Handle::ZERO`] outside a dispatch. Diagnostics only; never read
/// across threads.
pub fn current_handle() -> Handle {
    CURRENT_HANDLE.with(|slot| Handle::from_raw(slot.get()))
}

pub(crate) fn set_current_handle(handle: Handle) {
    CURRENT_HANDLE.with(|slot| slot.set(handle.raw()));
}

/// Live-context accounting shared between the node and every context.
#[derive(Default)]
pub(crate) struct NodeStats {
    total: AtomicI64,
}

impl NodeStats {
    pub(crate) fn context_created(&self) {
        self.total.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn context_destroyed(&self) {
        self.total.fetch_sub(1, Ordering::AcqRel);
    }

    pub(crate) fn total(&self) -> i64 {
        self.total.load(Ordering::Acquire)
    }
}

struct NodeInner {
    config: NodeConfig,
    registry: Registry,
    global: Arc<GlobalQueue>,
    modules: ModuleRegistry,
    env: Env,
    stats: Arc<NodeStats>,
    monitor_exit: AtomicU32,
    profile: AtomicBool,
    start_time: i64,
    harbor: RwLock<Option<Arc<dyn Harbor>>>,
    timer: RwLock<Option<Arc<dyn TimerDriver>>>,
}

impl Drop for NodeInner {
    fn drop(&mut self) {
        // Mailboxes hold the global queue and the queue holds linked
        // mailboxes; emptying it here breaks the cycle for anything no
        // worker ever came back for.
        self.global.clear();
    }
}

/// One runtime instance: registry, ready queue, module table, env table,
/// and the send/launch/command surface.
///
/// A `Node` is a cheap handle over shared state; clone it freely into
/// worker threads and callbacks. Tests can run several nodes side by side,
/// each fully independent.
///
/// # Example
///
/// ```rust,ignore
/// use hive_rt::{Node, NodeConfig, WorkerPool};
///
/// let node = Node::new(NodeConfig::default());
/// node.modules().install("echo", my_echo_module)?;
/// let echo = node.launch("echo", None)?;
/// drop(echo);
/// let pool = WorkerPool::start(&node);
/// // ... drive the node, then ABORT and join.
/// pool.join();
/// ```
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Node {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Node {
    /// Create a node from a validated configuration.
    pub fn new(config: NodeConfig) -> Node {
        let env = Env::new(config.environment.clone());
        Node {
            inner: Arc::new(NodeInner {
                registry: Registry::new(config.node_id),
                global: GlobalQueue::new(),
                modules: ModuleRegistry::new(),
                env,
                stats: Arc::new(NodeStats::default()),
                monitor_exit: AtomicU32::new(0),
                profile: AtomicBool::new(config.profile),
                start_time: Utc::now().timestamp(),
                harbor: RwLock::new(None),
                timer: RwLock::new(None),
                config,
            }),
        }
    }

    /// The configuration this node was built from.
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// The installed-module table.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.inner.modules
    }

    /// The handle registry.
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub(crate) fn global_queue(&self) -> &Arc<GlobalQueue> {
        &self.inner.global
    }

    /// Install the inter-node transport.
    pub fn set_harbor(&self, harbor: Arc<dyn Harbor>) {
        *self.inner.harbor.write() = Some(harbor);
    }

    /// Install the timer collaborator behind the TIMEOUT command.
    pub fn set_timer_driver(&self, timer: Arc<dyn TimerDriver>) {
        *self.inner.timer.write() = Some(timer);
    }

    pub(crate) fn timer_driver(&self) -> Option<Arc<dyn TimerDriver>> {
        self.inner.timer.read().clone()
    }

    /// Number of live, non-reserved contexts. Shutdown is complete when
    /// this reaches zero.
    pub fn total(&self) -> i64 {
        self.inner.stats.total()
    }

    /// Node start time, seconds since the Unix epoch.
    pub fn start_time(&self) -> i64 {
        self.inner.start_time
    }

    /// Whether new contexts account callback CPU time.
    pub fn profile_enabled(&self) -> bool {
        self.inner.profile.load(Ordering::Relaxed)
    }

    /// Toggle CPU accounting for contexts launched from now on.
    pub fn enable_profile(&self, enabled: bool) {
        self.inner.profile.store(enabled, Ordering::Relaxed);
    }

    /// Read one env table entry.
    pub fn env_get(&self, key: &str) -> Option<String> {
        self.inner.env.get(key)
    }

    /// Write one env table entry.
    pub fn env_set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.env.set(key, value);
    }

    /// Handle notified with a CLIENT message whenever a context exits, or
    /// [`Handle::ZERO`] when unset.
    pub fn monitor_exit(&self) -> Handle {
        Handle::from_raw(self.inner.monitor_exit.load(Ordering::Acquire))
    }

    /// Install (or clear, with [`Handle::ZERO`]) the exit monitor.
    pub fn set_monitor_exit(&self, handle: Handle) {
        self.inner.monitor_exit.store(handle.raw(), Ordering::Release);
    }

    /// Resolve a handle to its live context.
    pub fn grab(&self, handle: Handle) -> Option<Arc<ServiceContext>> {
        self.inner.registry.grab(handle)
    }

    /// Resolve `:hex` and `.name` address text to a handle.
    pub fn query_name(&self, name: &str) -> Option<Handle> {
        if let Some(hex) = name.strip_prefix(':') {
            return hex.parse::<Handle>().ok();
        }
        if let Some(alias) = name.strip_prefix('.') {
            return self.inner.registry.find_name(alias);
        }
        None
    }

    /// Exclude a context from the live count so shutdown can complete
    /// while the caller keeps holding it. Released last, by the holder.
    pub fn reserve(&self, ctx: &ServiceContext) {
        ctx.mark_reserved();
    }

    pub(crate) fn mark_endless(&self, handle: Handle) {
        if let Some(ctx) = self.inner.registry.grab(handle) {
            ctx.mark_endless();
        }
    }

    /// Emit a node log line attributed to `source`.
    ///
    /// When a service is registered under the configured logger name, the
    /// line is delivered to it as a TEXT message; otherwise it goes to
    /// `tracing`.
    pub fn emit_log(&self, source: Handle, text: impl Into<String>) {
        let text = text.into();
        match self.inner.registry.find_name(&self.inner.config.logger_service) {
            Some(logger) => {
                let message = Message {
                    source,
                    session: 0,
                    kind: MessageKind::TEXT,
                    payload: Some(text.into_bytes().into_boxed_slice()),
                };
                if self.push(logger, message).is_err() {
                    tracing::error!(source = %source, "dropped log line for dead logger service");
                }
            }
            None => tracing::error!(source = %source, "{text}"),
        }
    }

    /// Launch a new service from an installed module.
    ///
    /// The full sequence: module lookup, `create`, handle registration,
    /// mailbox allocation, `init`. On success the mailbox is force-linked
    /// into the ready queue so anything that arrived during init gets
    /// dispatched. On failure everything is unwound and queued messages
    /// are answered with ERROR replies.
    pub fn launch(
        &self,
        module: &str,
        param: Option<&str>,
    ) -> Result<Arc<ServiceContext>, LaunchError> {
        let factory = self
            .inner
            .modules
            .query(module)
            .ok_or_else(|| LaunchError::UnknownModule(module.to_string()))?;
        let instance = factory.create().map_err(LaunchError::Create)?;

        let mailbox = Mailbox::new(Arc::clone(&self.inner.global));
        let ctx = ServiceContext::new(
            module,
            instance,
            mailbox,
            Arc::clone(&self.inner.stats),
            self.profile_enabled(),
        );
        let handle = self.inner.registry.register(&ctx)?;

        match ServiceContext::run_init(&ctx, self, param) {
            Ok(()) => {
                ctx.mark_init_done();
                // Publish the mailbox even if it is empty. Messages sent
                // during init saw in_global set and never linked it; this
                // is the one linking that makes them reachable.
                self.inner.global.push(Arc::clone(ctx.mailbox()));
                self.emit_log(handle, format!("LAUNCH {module} {}", param.unwrap_or("")));
                Ok(ctx)
            }
            Err(error) => {
                self.emit_log(handle, format!("FAILED launch {module}"));
                let mailbox = Arc::clone(ctx.mailbox());
                self.inner.registry.retire(handle);
                drop(ctx);
                // Both references are gone, so the release flag is up and
                // the drain below answers anything queued during init.
                mailbox.destroy(|message| self.drop_message(message, handle));
                Err(LaunchError::Init(error))
            }
        }
    }

    /// Enqueue a message for a local destination.
    ///
    /// Ownership of the message transfers on success. On failure it comes
    /// back inside the error for the caller to drop or reroute.
    pub fn push(&self, destination: Handle, message: Message) -> Result<(), PushError> {
        match self.inner.registry.grab(destination) {
            Some(ctx) => {
                ctx.mailbox().push(message);
                Ok(())
            }
            None => Err(PushError(message)),
        }
    }

    /// Send a message.
    ///
    /// `ctx` is the sending context when there is one; it supplies the
    /// substitute source for [`Handle::ZERO`] and the session counter for
    /// [`SendFlags::ALLOC_SESSION`]. A zero `destination` allocates and
    /// returns the session without enqueueing anything, which is how a
    /// caller reserves a session before arranging the delivery itself.
    ///
    /// Returns the session travelling with the message.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        ctx: Option<&ServiceContext>,
        source: Handle,
        destination: Handle,
        kind: MessageKind,
        flags: SendFlags,
        session: i32,
        payload: Option<Box<[u8]>>,
    ) -> Result<i32, SendError> {
        let size = payload.as_ref().map_or(0, |p| p.len());
        if size > MAX_PAYLOAD {
            self.emit_log(
                ctx.map_or(source, ServiceContext::handle),
                format!("The message to {destination} is too large"),
            );
            return Err(SendError::PayloadTooLarge { size });
        }

        let mut session = session;
        if flags.contains(SendFlags::ALLOC_SESSION) {
            if session != 0 {
                return Err(SendError::SessionNotZero);
            }
            session = ctx.ok_or(SendError::NoContext)?.new_session();
        }

        let source = if source.is_zero() {
            ctx.map_or(Handle::ZERO, ServiceContext::handle)
        } else {
            source
        };

        if destination.is_zero() {
            return Ok(session);
        }

        if self.is_remote(destination) {
            let harbor = self.inner.harbor.read().clone().ok_or(SendError::NoHarbor)?;
            harbor.send(
                RemoteMessage {
                    destination: RemoteDestination::Handle(destination),
                    kind,
                    payload,
                },
                source,
                session,
            );
            return Ok(session);
        }

        let message = Message {
            source,
            session,
            kind,
            payload,
        };
        self.push(destination, message)
            .map_err(|_| SendError::UnknownHandle(destination))?;
        Ok(session)
    }

    /// Send to a textual address: `:hex` for a direct handle, `.name` for
    /// a local alias, anything else for a remote global name.
    #[allow(clippy::too_many_arguments)]
    pub fn send_name(
        &self,
        ctx: Option<&ServiceContext>,
        source: Handle,
        destination: &str,
        kind: MessageKind,
        flags: SendFlags,
        session: i32,
        payload: Option<Box<[u8]>>,
    ) -> Result<i32, SendError> {
        if destination.starts_with(':') {
            let handle = destination
                .parse::<Handle>()
                .map_err(|_| SendError::UnknownName(destination.to_string()))?;
            return self.send(ctx, source, handle, kind, flags, session, payload);
        }
        if let Some(alias) = destination.strip_prefix('.') {
            let handle = self
                .inner
                .registry
                .find_name(alias)
                .ok_or_else(|| SendError::UnknownName(destination.to_string()))?;
            return self.send(ctx, source, handle, kind, flags, session, payload);
        }

        // Remote global name: the same argument filtering as `send`, then
        // straight to the harbor.
        let size = payload.as_ref().map_or(0, |p| p.len());
        if size > MAX_PAYLOAD {
            return Err(SendError::PayloadTooLarge { size });
        }
        let mut session = session;
        if flags.contains(SendFlags::ALLOC_SESSION) {
            if session != 0 {
                return Err(SendError::SessionNotZero);
            }
            session = ctx.ok_or(SendError::NoContext)?.new_session();
        }
        let source = if source.is_zero() {
            ctx.map_or(Handle::ZERO, ServiceContext::handle)
        } else {
            source
        };
        let harbor = self.inner.harbor.read().clone().ok_or(SendError::NoHarbor)?;
        harbor.send(
            RemoteMessage {
                destination: RemoteDestination::Named(destination.to_string()),
                kind,
                payload,
            },
            source,
            session,
        );
        Ok(session)
    }

    /// Run a text command on behalf of `ctx`. See the command table in
    /// [`crate::command`].
    pub fn command(&self, ctx: &Arc<ServiceContext>, command: &str, param: &str) -> Option<String> {
        crate::command::execute(self, ctx, command, param)
    }

    /// Synchronously drain `ctx`'s mailbox through its callback on the
    /// calling thread. Shutdown-path helper for services (the logger) that
    /// must flush before the node goes away; not for use while workers are
    /// dispatching the same context.
    pub fn dispatch_all(&self, ctx: &Arc<ServiceContext>) {
        while let Some(message) = ctx.mailbox().pop() {
            crate::dispatch::deliver(self, ctx, message);
        }
    }

    /// Answer a message whose destination died: the payload is dropped and
    /// the sender gets an empty ERROR reply carrying the same session, so
    /// a waiting caller observes failure instead of hanging.
    pub(crate) fn drop_message(&self, message: Message, from: Handle) {
        let Message {
            source, session, ..
        } = message;
        if source.is_zero() {
            return;
        }
        let _ = self.send(
            None,
            from,
            source,
            MessageKind::ERROR,
            SendFlags::empty(),
            session,
            None,
        );
    }

    /// The EXIT/KILL path: notify the exit monitor, then retire.
    pub(crate) fn handle_exit(&self, ctx: &ServiceContext, handle: Handle) {
        let target = if handle.is_zero() {
            self.emit_log(ctx.handle(), "KILL self");
            ctx.handle()
        } else {
            self.emit_log(ctx.handle(), format!("KILL {handle}"));
            handle
        };
        let monitor = self.monitor_exit();
        if !monitor.is_zero() {
            let _ = self.send(
                Some(ctx),
                target,
                monitor,
                MessageKind::CLIENT,
                SendFlags::empty(),
                0,
                None,
            );
        }
        self.inner.registry.retire(target);
    }

    fn is_remote(&self, handle: Handle) -> bool {
        let node = handle.node();
        node != 0 && node != self.inner.config.node_id
    }
}
