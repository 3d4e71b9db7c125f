//! Shared fixtures for the integration suites: a handful of small modules
//! exercising the runtime the way real services do.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hive_rt::{
    BoxError, Handle, Instance, MessageKind, Module, Node, NodeConfig, SendFlags, ServiceContext,
};

/// One message as observed by a [`CollectorModule`] service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub source: Handle,
    pub session: i32,
    pub kind: MessageKind,
    pub payload: Vec<u8>,
}

/// Replies to every message with a RESPONSE carrying the same payload and
/// session.
pub struct EchoModule;

struct EchoInstance;

impl Module for EchoModule {
    fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
        Ok(Box::new(EchoInstance))
    }
}

impl Instance for EchoInstance {
    fn init(
        &mut self,
        _node: &Node,
        ctx: &Arc<ServiceContext>,
        _param: Option<&str>,
    ) -> Result<(), BoxError> {
        ctx.bind_callback(|node, ctx, message| {
            let _ = node.send(
                Some(ctx),
                Handle::ZERO,
                message.source,
                MessageKind::RESPONSE,
                SendFlags::empty(),
                message.session,
                message.payload,
            );
        });
        Ok(())
    }
}

/// Forwards every received message into an mpsc channel.
pub struct CollectorModule {
    sender: Mutex<Sender<Received>>,
}

struct CollectorInstance {
    sender: Sender<Received>,
}

impl CollectorModule {
    pub fn new() -> (Self, Receiver<Received>) {
        let (sender, receiver) = channel();
        (
            CollectorModule {
                sender: Mutex::new(sender),
            },
            receiver,
        )
    }
}

impl Module for CollectorModule {
    fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
        let sender = self.sender.lock().map_err(|_| "collector sender poisoned")?.clone();
        Ok(Box::new(CollectorInstance { sender }))
    }
}

impl Instance for CollectorInstance {
    fn init(
        &mut self,
        _node: &Node,
        ctx: &Arc<ServiceContext>,
        _param: Option<&str>,
    ) -> Result<(), BoxError> {
        let sender = self.sender.clone();
        ctx.bind_callback(move |_node, _ctx, message| {
            let _ = sender.send(Received {
                source: message.source,
                session: message.session,
                kind: message.kind,
                payload: message.payload.as_deref().unwrap_or(&[]).to_vec(),
            });
        });
        Ok(())
    }
}

/// Sleeps in its callback while counting invocations and overlaps. One
/// instance dispatched exclusively must never observe an overlap.
pub struct SleeperModule {
    pub delay: Duration,
    pub active: Arc<AtomicUsize>,
    pub overlaps: Arc<AtomicUsize>,
    pub processed: Arc<AtomicUsize>,
}

impl SleeperModule {
    pub fn new(delay: Duration) -> Self {
        SleeperModule {
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            overlaps: Arc::new(AtomicUsize::new(0)),
            processed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct SleeperInstance {
    delay: Duration,
    active: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
    processed: Arc<AtomicUsize>,
}

impl Module for SleeperModule {
    fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
        Ok(Box::new(SleeperInstance {
            delay: self.delay,
            active: Arc::clone(&self.active),
            overlaps: Arc::clone(&self.overlaps),
            processed: Arc::clone(&self.processed),
        }))
    }
}

impl Instance for SleeperInstance {
    fn init(
        &mut self,
        _node: &Node,
        ctx: &Arc<ServiceContext>,
        _param: Option<&str>,
    ) -> Result<(), BoxError> {
        let delay = self.delay;
        let active = Arc::clone(&self.active);
        let overlaps = Arc::clone(&self.overlaps);
        let processed = Arc::clone(&self.processed);
        ctx.bind_callback(move |_node, _ctx, _message| {
            if active.fetch_add(1, Ordering::SeqCst) > 0 {
                overlaps.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::sleep(delay);
            active.fetch_sub(1, Ordering::SeqCst);
            processed.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    }
}

/// Initializes successfully without binding a callback; every message
/// dispatched to it is dropped by the runtime.
pub struct NullModule;

struct NullInstance;

impl Module for NullModule {
    fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
        Ok(Box::new(NullInstance))
    }
}

impl Instance for NullInstance {
    fn init(
        &mut self,
        _node: &Node,
        _ctx: &Arc<ServiceContext>,
        _param: Option<&str>,
    ) -> Result<(), BoxError> {
        Ok(())
    }
}

/// A node with the standard test modules installed.
pub fn test_node(config: NodeConfig) -> (Node, Receiver<Received>) {
    let node = Node::new(config);
    let (collector, received) = CollectorModule::new();
    node.modules()
        .install("collector", Arc::new(collector))
        .unwrap();
    node.modules().install("echo", Arc::new(EchoModule)).unwrap();
    node.modules().install("null", Arc::new(NullModule)).unwrap();
    (node, received)
}

/// Route `tracing` output through the test harness. Idempotent.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll until `predicate` holds or the deadline passes.
pub fn wait_until(deadline: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}
