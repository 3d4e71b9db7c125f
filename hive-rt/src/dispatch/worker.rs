// Layer 1: Standard library imports
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::monitor::WorkerMonitor;
use crate::mailbox::Mailbox;
use crate::message::Message;
use crate::service::context::Callback;
use crate::service::ServiceContext;
use crate::system::node::set_current_handle;
use crate::system::Node;
use crate::util::time::thread_cpu_micros;
use crate::util::Handle;

/// How long an idle worker parks on the ready queue before rechecking the
/// quit flag.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Batch weights for the first 32 workers. A negative weight drains one
/// message per visit (latency); weight `w >= 0` drains `len >> w` messages
/// (throughput). Mixing both classes across the pool keeps small services
/// responsive while flooded ones still clear their backlogs.
const WEIGHTS: [i32; 32] = [
    -1, -1, -1, -1, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3,
    3, 3,
];

/// Batch weight assigned to worker `index`. Workers past the table fall
/// back to one message per visit.
pub fn weight_for(index: usize) -> i32 {
    WEIGHTS.get(index).copied().unwrap_or(-1)
}

/// Invoke the service callback for one message.
///
/// The callback slot is detached for the duration of the call, so the
/// callback itself may rebind it (or trigger a nested synchronous drain)
/// without deadlocking on its own slot.
pub(crate) fn deliver(node: &Node, ctx: &Arc<ServiceContext>, message: Message) {
    set_current_handle(ctx.handle());
    ctx.record_log(&message);
    ctx.note_message();
    match ctx.take_callback() {
        // No callback bound: the payload is dropped here.
        Callback::Unbound => {}
        Callback::Bound(mut callback) => {
            if ctx.profile_enabled() {
                let start = thread_cpu_micros();
                ctx.set_cpu_start(start);
                callback(node, ctx, message);
                ctx.add_cpu_cost(thread_cpu_micros().saturating_sub(start));
            } else {
                callback(node, ctx, message);
            }
            ctx.restore_callback(Callback::Bound(callback));
        }
    }
}

/// One scheduling step of a worker.
///
/// Takes the mailbox the worker already owns (or pops one from the ready
/// queue), drains a weight-bounded batch of messages through the owning
/// context's callback, then trades the mailbox for the next ready one.
/// Returns the mailbox the worker should run next, or `None` when the node
/// has no work at all (the caller parks).
///
/// A mailbox whose owner no longer resolves is handed to its destruction
/// path: drained with ERROR replies once the release flag is up, relinked
/// for a later retry otherwise.
pub fn dispatch(
    node: &Node,
    monitor: &WorkerMonitor,
    current: Option<Arc<Mailbox>>,
    weight: i32,
) -> Option<Arc<Mailbox>> {
    let queue = match current {
        Some(queue) => queue,
        None => node.global_queue().pop()?,
    };

    let handle = queue.owner();
    let Some(ctx) = node.grab(handle) else {
        queue.destroy(|message| node.drop_message(message, handle));
        return node.global_queue().pop();
    };

    let mut batch = 1usize;
    let mut index = 0usize;
    while index < batch {
        let Some(message) = queue.pop() else {
            // Drained empty: the pop cleared in_global, so the next push
            // re-links the mailbox. Nothing to requeue.
            return node.global_queue().pop();
        };
        if index == 0 && weight >= 0 {
            batch = queue.len() >> (weight as u32);
        }

        if let Some(length) = queue.overload() {
            node.emit_log(
                handle,
                format!("May overload, message queue length = {length}"),
            );
        }

        monitor.trigger(message.source, handle);
        if ctx.has_callback() {
            deliver(node, &ctx, message);
        }
        monitor.trigger(Handle::ZERO, Handle::ZERO);
        index += 1;
    }

    // Trade fairly: if another mailbox is waiting, requeue this one behind
    // it; otherwise keep it for the next batch.
    match node.global_queue().pop() {
        Some(next) => {
            node.global_queue().push(queue);
            Some(next)
        }
        None => Some(queue),
    }
}

struct PoolShared {
    quit: AtomicBool,
}

/// The fixed pool of worker threads plus the watchdog thread.
///
/// Workers run [`dispatch`] in a loop and park on the ready queue when the
/// node is idle. The watchdog samples every worker's [`WorkerMonitor`] for
/// stuck callbacks and, once the node's live context count reaches zero
/// (the ABORT path), tells the workers to quit.
///
/// Start the pool after the initial services are launched; a node with no
/// live contexts shuts straight down.
pub struct WorkerPool {
    node: Node,
    shared: Arc<PoolShared>,
    threads: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the configured number of workers and the watchdog.
    pub fn start(node: &Node) -> WorkerPool {
        let shared = Arc::new(PoolShared {
            quit: AtomicBool::new(false),
        });
        let count = node.config().worker_threads;
        let monitors: Vec<Arc<WorkerMonitor>> =
            (0..count).map(|_| Arc::new(WorkerMonitor::new())).collect();

        let mut threads = Vec::with_capacity(count + 1);
        for (index, monitor) in monitors.iter().enumerate() {
            let node = node.clone();
            let shared = Arc::clone(&shared);
            let monitor = Arc::clone(monitor);
            let spawned = thread::Builder::new()
                .name(format!("hive-worker-{index}"))
                .spawn(move || worker_loop(node, monitor, shared, weight_for(index)));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(error) => tracing::error!(%error, index, "failed to spawn worker thread"),
            }
        }

        {
            let node = node.clone();
            let shared = Arc::clone(&shared);
            let spawned = thread::Builder::new()
                .name("hive-watchdog".to_string())
                .spawn(move || watchdog_loop(node, monitors, shared));
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(error) => tracing::error!(%error, "failed to spawn watchdog thread"),
            }
        }

        WorkerPool {
            node: node.clone(),
            shared,
            threads,
        }
    }

    /// Whether the pool has been told to quit.
    pub fn quitting(&self) -> bool {
        self.shared.quit.load(Ordering::Acquire)
    }

    /// Wait for the node to drain (live context count zero) and the
    /// threads to exit, then destroy whatever mailboxes were still linked.
    ///
    /// Callers must have dropped their own context references first;
    /// a context held elsewhere keeps the count above zero forever.
    pub fn join(mut self) {
        for handle in self.threads.drain(..) {
            let _ = handle.join();
        }
        self.sweep();
    }

    /// Tell every thread to quit now, without waiting for the node to
    /// drain, and join them.
    pub fn shutdown(self) {
        self.shared.quit.store(true, Ordering::Release);
        self.node.global_queue().notify_all();
        self.join();
    }

    /// Destroy released mailboxes no worker will visit again.
    fn sweep(&self) {
        let mut keep = Vec::new();
        while let Some(queue) = self.node.global_queue().pop() {
            let owner = queue.owner();
            if self.node.grab(owner).is_none() && queue.is_released() {
                queue.destroy(|message| self.node.drop_message(message, owner));
            } else {
                keep.push(queue);
            }
        }
        for queue in keep {
            self.node.global_queue().push(queue);
        }
    }
}

fn worker_loop(node: Node, monitor: Arc<WorkerMonitor>, shared: Arc<PoolShared>, weight: i32) {
    let mut current: Option<Arc<Mailbox>> = None;
    loop {
        current = dispatch(&node, &monitor, current.take(), weight);
        if current.is_none() {
            if shared.quit.load(Ordering::Acquire) {
                return;
            }
            node.global_queue().wait(IDLE_WAIT);
        }
    }
}

fn watchdog_loop(node: Node, monitors: Vec<Arc<WorkerMonitor>>, shared: Arc<PoolShared>) {
    let threshold = node.config().stuck_threshold;
    let slice = (threshold / 5).max(Duration::from_millis(1));
    'run: loop {
        if node.total() == 0 {
            break;
        }
        for monitor in &monitors {
            monitor.check(&node);
        }
        for _ in 0..5 {
            if node.total() == 0 || shared.quit.load(Ordering::Acquire) {
                break 'run;
            }
            thread::sleep(slice);
        }
    }
    shared.quit.store(true, Ordering::Release);
    node.global_queue().notify_all();
}
