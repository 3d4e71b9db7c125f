// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::service::ServiceContext;
use crate::system::Node;
use crate::util::time::thread_cpu_micros;
use crate::util::Handle;

/// Execute one text command on behalf of `ctx`.
///
/// Returns the textual result, or `None` for commands that have none (and
/// for unknown commands and malformed parameters).
pub fn execute(node: &Node, ctx: &Arc<ServiceContext>, command: &str, param: &str) -> Option<String> {
    match command {
        "TIMEOUT" => cmd_timeout(node, ctx, param),
        "REG" => cmd_reg(node, ctx, param),
        "QUERY" => cmd_query(node, param),
        "NAME" => cmd_name(node, param),
        "EXIT" => {
            node.handle_exit(ctx, Handle::ZERO);
            None
        }
        "KILL" => {
            let handle = to_handle(node, ctx, param);
            if !handle.is_zero() {
                node.handle_exit(ctx, handle);
            }
            None
        }
        "LAUNCH" => cmd_launch(node, param),
        "GETENV" => node.env_get(param.trim()),
        "SETENV" => cmd_setenv(node, param),
        "STARTTIME" => Some(node.start_time().to_string()),
        "ABORT" => {
            node.registry().retire_all();
            None
        }
        "MONITOR" => cmd_monitor(node, ctx, param),
        "STAT" => cmd_stat(ctx, param),
        "LOGON" => cmd_logon(node, ctx, param),
        "LOGOFF" => cmd_logoff(node, ctx, param),
        "SIGNAL" => cmd_signal(node, ctx, param),
        _ => None,
    }
}

/// Resolve a `:hex` or `.name` command parameter to a handle; zero when
/// it does not resolve.
fn to_handle(node: &Node, ctx: &ServiceContext, param: &str) -> Handle {
    let param = param.trim();
    if param.starts_with(':') {
        param.parse().unwrap_or(Handle::ZERO)
    } else if let Some(name) = param.strip_prefix('.') {
        node.registry().find_name(name).unwrap_or(Handle::ZERO)
    } else {
        node.emit_log(ctx.handle(), format!("Can't convert {param} to handle"));
        Handle::ZERO
    }
}

fn cmd_timeout(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let centisecs: i32 = param.trim().parse().ok()?;
    let Some(timer) = node.timer_driver() else {
        node.emit_log(ctx.handle(), "TIMEOUT with no timer driver installed");
        return None;
    };
    let session = ctx.new_session();
    timer.timeout(ctx.handle(), centisecs, session);
    Some(session.to_string())
}

fn cmd_reg(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let param = param.trim();
    if param.is_empty() {
        return Some(ctx.handle().to_string());
    }
    if let Some(name) = param.strip_prefix('.') {
        return node
            .registry()
            .bind_name(name, ctx.handle())
            .ok()
            .map(|()| format!(".{name}"));
    }
    node.emit_log(
        ctx.handle(),
        format!("Can't register global name {param} in C"),
    );
    None
}

fn cmd_query(node: &Node, param: &str) -> Option<String> {
    let name = param.trim().strip_prefix('.')?;
    node.registry()
        .find_name(name)
        .map(|handle| handle.to_string())
}

fn cmd_name(node: &Node, param: &str) -> Option<String> {
    let mut parts = param.split_whitespace();
    let name = parts.next()?;
    let handle_text = parts.next()?;
    if !handle_text.starts_with(':') {
        return None;
    }
    let handle: Handle = handle_text.parse().ok()?;
    if handle.is_zero() {
        return None;
    }
    let name = name.strip_prefix('.')?;
    node.registry()
        .bind_name(name, handle)
        .ok()
        .map(|()| format!(".{name}"))
}

fn cmd_launch(node: &Node, param: &str) -> Option<String> {
    let param = param.trim();
    if param.is_empty() {
        return None;
    }
    let (module, args) = match param.split_once(char::is_whitespace) {
        Some((module, rest)) => (module, Some(rest.trim())),
        None => (param, None),
    };
    let args = args.filter(|rest| !rest.is_empty());
    node.launch(module, args)
        .ok()
        .map(|launched| launched.handle().to_string())
}

fn cmd_setenv(node: &Node, param: &str) -> Option<String> {
    let (key, value) = param.split_once(' ')?;
    if key.is_empty() {
        return None;
    }
    node.env_set(key, value);
    None
}

fn cmd_monitor(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let param = param.trim();
    if param.is_empty() {
        let monitor = node.monitor_exit();
        if monitor.is_zero() {
            return None;
        }
        return Some(monitor.to_string());
    }
    node.set_monitor_exit(to_handle(node, ctx, param));
    None
}

fn cmd_stat(ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let result = match param.trim() {
        "mqlen" => ctx.mailbox().len().to_string(),
        "endless" => {
            if ctx.take_endless() {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        "cpu" => format!("{:.6}", ctx.cpu_cost_micros() as f64 / 1_000_000.0),
        "time" => {
            if ctx.profile_enabled() {
                let running = thread_cpu_micros().saturating_sub(ctx.cpu_start_micros());
                format!("{:.6}", running as f64 / 1_000_000.0)
            } else {
                "0".to_string()
            }
        }
        "message" => ctx.message_count().to_string(),
        _ => String::new(),
    };
    Some(result)
}

fn cmd_logon(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let handle = to_handle(node, ctx, param);
    if handle.is_zero() {
        return None;
    }
    let target = node.grab(handle)?;
    match target.open_log_sink(&node.config().log_dir) {
        Ok(true) => node.emit_log(
            ctx.handle(),
            format!("open log file {}/{:08x}.log", node.config().log_dir.display(), handle.raw()),
        ),
        Ok(false) => {}
        Err(error) => node.emit_log(ctx.handle(), format!("open log file failed: {error}")),
    }
    None
}

fn cmd_logoff(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let handle = to_handle(node, ctx, param);
    if handle.is_zero() {
        return None;
    }
    let target = node.grab(handle)?;
    if let Some(path) = target.close_log_sink() {
        node.emit_log(ctx.handle(), format!("close log file {}", path.display()));
    }
    None
}

fn cmd_signal(node: &Node, ctx: &Arc<ServiceContext>, param: &str) -> Option<String> {
    let mut parts = param.split_whitespace();
    let target_text = parts.next()?;
    let handle = to_handle(node, ctx, target_text);
    if handle.is_zero() {
        return None;
    }
    let target = node.grab(handle)?;
    let signal = parts.next().map_or(0, parse_signal);
    // The instance's signal hook is required to be thread-safe; it may run
    // while the target's callback is mid-message on a worker.
    target.signal(signal);
    None
}

fn parse_signal(text: &str) -> i32 {
    if let Some(hex) = text.strip_prefix("0x") {
        i32::from_str_radix(hex, 16).unwrap_or(0)
    } else {
        text.parse().unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::service::{BoxError, Instance, Module};
    use crate::system::{NodeConfig, TimerDriver};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct EchoSink;

    impl Module for EchoSink {
        fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
            Ok(Box::new(EchoSinkInstance))
        }
    }

    struct EchoSinkInstance;

    impl Instance for EchoSinkInstance {
        fn init(
            &mut self,
            _node: &Node,
            ctx: &Arc<ServiceContext>,
            _param: Option<&str>,
        ) -> Result<(), BoxError> {
            ctx.bind_callback(|_node, _ctx, _message| {});
            Ok(())
        }
    }

    struct SignalModule {
        last: Arc<AtomicI32>,
    }

    struct SignalInstance {
        last: Arc<AtomicI32>,
    }

    impl Module for SignalModule {
        fn create(&self) -> Result<Box<dyn Instance>, BoxError> {
            Ok(Box::new(SignalInstance {
                last: Arc::clone(&self.last),
            }))
        }
    }

    impl Instance for SignalInstance {
        fn init(
            &mut self,
            _node: &Node,
            _ctx: &Arc<ServiceContext>,
            _param: Option<&str>,
        ) -> Result<(), BoxError> {
            Ok(())
        }

        fn signal(&self, signal: i32) {
            self.last.store(signal, Ordering::SeqCst);
        }
    }

    struct RecordingTimer {
        fired: Mutex<Vec<(Handle, i32, i32)>>,
    }

    impl TimerDriver for RecordingTimer {
        fn timeout(&self, handle: Handle, centisecs: i32, session: i32) {
            self.fired.lock().push((handle, centisecs, session));
        }
    }

    fn test_node() -> (Node, Arc<ServiceContext>) {
        let node = Node::new(NodeConfig::default());
        node.modules().install("echo", Arc::new(EchoSink)).unwrap();
        let ctx = node.launch("echo", None).unwrap();
        (node, ctx)
    }

    #[test]
    fn test_unknown_command() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "NOPE", ""), None);
    }

    #[test]
    fn test_reg_returns_own_handle() {
        let (node, ctx) = test_node();
        assert_eq!(
            node.command(&ctx, "REG", "").as_deref(),
            Some(":00000001")
        );
    }

    #[test]
    fn test_reg_query_kill_cycle() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "REG", ".svc").as_deref(), Some(".svc"));
        assert_eq!(
            node.command(&ctx, "QUERY", ".svc"),
            Some(ctx.handle().to_string())
        );
        // Duplicate registration fails.
        assert_eq!(node.command(&ctx, "REG", ".svc"), None);

        node.command(&ctx, "KILL", ".svc");
        assert_eq!(node.command(&ctx, "QUERY", ".svc"), None);
        assert!(node.grab(ctx.handle()).is_none());
    }

    #[test]
    fn test_name_binds_other_handle() {
        let (node, ctx) = test_node();
        let other = node.launch("echo", None).unwrap();
        let param = format!(".other {}", other.handle());
        assert_eq!(node.command(&ctx, "NAME", &param).as_deref(), Some(".other"));
        assert_eq!(
            node.command(&ctx, "QUERY", ".other"),
            Some(other.handle().to_string())
        );
        // Malformed handle text is rejected.
        assert_eq!(node.command(&ctx, "NAME", ".bad 12AB"), None);
    }

    #[test]
    fn test_exit_retires_self() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "EXIT", ""), None);
        assert!(node.grab(ctx.handle()).is_none());
    }

    #[test]
    fn test_launch_returns_new_handle() {
        let (node, ctx) = test_node();
        let result = node.command(&ctx, "LAUNCH", "echo startup args").unwrap();
        assert_eq!(result, ":00000002");
        assert_eq!(node.command(&ctx, "LAUNCH", "missing"), None);
        assert_eq!(node.command(&ctx, "LAUNCH", ""), None);
    }

    #[test]
    fn test_env_commands() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "GETENV", "boot"), None);
        assert_eq!(node.command(&ctx, "SETENV", "boot main"), None);
        assert_eq!(node.command(&ctx, "GETENV", "boot").as_deref(), Some("main"));
        // No separator: refused.
        assert_eq!(node.command(&ctx, "SETENV", "orphan"), None);
        assert_eq!(node.command(&ctx, "GETENV", "orphan"), None);
    }

    #[test]
    fn test_starttime_is_decimal_epoch() {
        let (node, ctx) = test_node();
        let text = node.command(&ctx, "STARTTIME", "").unwrap();
        let epoch: i64 = text.parse().unwrap();
        assert_eq!(epoch, node.start_time());
    }

    #[test]
    fn test_monitor_get_set() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "MONITOR", ""), None);
        node.command(&ctx, "MONITOR", ":00000001");
        assert_eq!(
            node.command(&ctx, "MONITOR", "").as_deref(),
            Some(":00000001")
        );
    }

    #[test]
    fn test_stat_reports() {
        let (node, ctx) = test_node();
        assert_eq!(node.command(&ctx, "STAT", "mqlen").as_deref(), Some("0"));
        assert_eq!(node.command(&ctx, "STAT", "message").as_deref(), Some("0"));
        assert_eq!(node.command(&ctx, "STAT", "endless").as_deref(), Some("0"));
        assert_eq!(node.command(&ctx, "STAT", "bogus").as_deref(), Some(""));

        let cpu = node.command(&ctx, "STAT", "cpu").unwrap();
        assert!(cpu.parse::<f64>().is_ok());
    }

    #[test]
    fn test_stat_endless_reads_destructively() {
        let (node, ctx) = test_node();
        ctx.mark_endless();
        assert_eq!(node.command(&ctx, "STAT", "endless").as_deref(), Some("1"));
        assert_eq!(node.command(&ctx, "STAT", "endless").as_deref(), Some("0"));
    }

    #[test]
    fn test_timeout_allocates_session_and_arms_timer() {
        let (node, ctx) = test_node();
        // Without a driver the command is refused.
        assert_eq!(node.command(&ctx, "TIMEOUT", "100"), None);

        let timer = Arc::new(RecordingTimer {
            fired: Mutex::new(Vec::new()),
        });
        node.set_timer_driver(Arc::clone(&timer) as Arc<dyn TimerDriver>);

        let session: i32 = node.command(&ctx, "TIMEOUT", "100").unwrap().parse().unwrap();
        assert!(session > 0);
        assert_eq!(timer.fired.lock()[0], (ctx.handle(), 100, session));

        let next: i32 = node.command(&ctx, "TIMEOUT", "0").unwrap().parse().unwrap();
        assert_eq!(next, session + 1);
    }

    #[test]
    fn test_signal_reaches_instance() {
        let node = Node::new(NodeConfig::default());
        let last = Arc::new(AtomicI32::new(-1));
        node.modules()
            .install("sig", Arc::new(SignalModule { last: Arc::clone(&last) }))
            .unwrap();
        let ctx = node.launch("sig", None).unwrap();

        node.command(&ctx, "SIGNAL", &ctx.handle().to_string());
        assert_eq!(last.load(Ordering::SeqCst), 0);
        node.command(&ctx, "SIGNAL", &format!("{} 9", ctx.handle()));
        assert_eq!(last.load(Ordering::SeqCst), 9);
        node.command(&ctx, "SIGNAL", &format!("{} 0x10", ctx.handle()));
        assert_eq!(last.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_abort_retires_everything() {
        let (node, ctx) = test_node();
        for _ in 0..5 {
            node.command(&ctx, "LAUNCH", "echo").unwrap();
        }
        assert_eq!(node.registry().live_count(), 6);
        node.command(&ctx, "ABORT", "");
        assert_eq!(node.registry().live_count(), 0);
    }

    #[test]
    fn test_logon_logoff_cycle() {
        let dir = std::env::temp_dir().join(format!("hive-rt-cmd-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let node = Node::new(
            NodeConfig::builder()
                .with_log_dir(&dir)
                .build()
                .unwrap(),
        );
        node.modules().install("echo", Arc::new(EchoSink)).unwrap();
        let ctx = node.launch("echo", None).unwrap();

        let target = ctx.handle().to_string();
        node.command(&ctx, "LOGON", &target);
        let path = dir.join(format!("{:08x}.log", ctx.handle().raw()));
        assert!(path.exists());
        node.command(&ctx, "LOGOFF", &target);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("open time:"));
        assert!(contents.contains("close time:"));
        std::fs::remove_dir_all(dir).ok();
    }
}
