//! Node configuration with sensible defaults.

// Layer 1: Standard library
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

// Layer 2: Third-party
use serde::{Deserialize, Serialize};

// Layer 3: Internal
// (none)

/// Default number of worker threads.
pub const DEFAULT_WORKER_THREADS: usize = 8;

/// Default node id; `0` means this node never talks to a harbor.
pub const DEFAULT_NODE_ID: u8 = 0;

/// Default dispatch profiling setting.
pub const DEFAULT_PROFILE: bool = true;

/// Default name of the service that receives node log lines.
pub const DEFAULT_LOGGER_SERVICE: &str = "logger";

/// Default directory for per-service message log files.
pub const DEFAULT_LOG_DIR: &str = ".";

/// Default time a callback may run before the watchdog flags it.
pub const DEFAULT_STUCK_THRESHOLD: Duration = Duration::from_secs(5);

/// Configuration for one [`Node`](crate::Node).
///
/// # Examples
///
/// ```rust
/// use hive_rt::system::config::{NodeConfig, DEFAULT_WORKER_THREADS};
/// use std::time::Duration;
///
/// // Use default configuration
/// let config = NodeConfig::default();
/// assert_eq!(config.worker_threads, DEFAULT_WORKER_THREADS);
///
/// // Use builder for custom configuration
/// let config = NodeConfig::builder()
///     .with_worker_threads(4)
///     .with_stuck_threshold(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.worker_threads, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Number of worker threads the pool spawns.
    pub worker_threads: usize,

    /// This node's id, stamped into the high 8 bits of every handle it
    /// allocates. `0` runs the node standalone.
    pub node_id: u8,

    /// Whether new contexts account callback CPU time.
    pub profile: bool,

    /// Name of the service node log lines are delivered to; when no such
    /// service is registered, lines fall through to `tracing`.
    pub logger_service: String,

    /// Directory per-service message logs (LOGON) are written to.
    pub log_dir: PathBuf,

    /// How long a callback may run before the watchdog marks its context
    /// endless.
    pub stuck_threshold: Duration,

    /// Search path hint for module loaders; the core does not interpret it.
    pub module_path: Option<String>,

    /// Bootstrap command hint for the startup driver; the core does not
    /// interpret it.
    pub bootstrap: Option<String>,

    /// Pid-file path hint for a daemonizing startup driver; the core does
    /// not interpret it.
    pub daemon: Option<PathBuf>,

    /// Output file hint handed to the logger service at bootstrap; the
    /// core does not interpret it.
    pub logger_output: Option<PathBuf>,

    /// Initial contents of the node's env table.
    #[serde(default)]
    pub environment: HashMap<String, String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            node_id: DEFAULT_NODE_ID,
            profile: DEFAULT_PROFILE,
            logger_service: DEFAULT_LOGGER_SERVICE.to_string(),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            stuck_threshold: DEFAULT_STUCK_THRESHOLD,
            module_path: None,
            bootstrap: None,
            daemon: None,
            logger_output: None,
            environment: HashMap::new(),
        }
    }
}

impl NodeConfig {
    /// Create a new configuration builder.
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_threads == 0 {
            return Err("worker_threads must be > 0".to_string());
        }
        if self.stuck_threshold.is_zero() {
            return Err("stuck_threshold must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for [`NodeConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    /// Set the worker thread count.
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the node id stamped into allocated handles.
    pub fn with_node_id(mut self, node_id: u8) -> Self {
        self.config.node_id = node_id;
        self
    }

    /// Enable or disable callback CPU profiling for new contexts.
    pub fn with_profile(mut self, enabled: bool) -> Self {
        self.config.profile = enabled;
        self
    }

    /// Set the name of the log-collecting service.
    pub fn with_logger_service(mut self, name: impl Into<String>) -> Self {
        self.config.logger_service = name.into();
        self
    }

    /// Set the directory for per-service message logs.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    /// Set the stuck-callback threshold.
    pub fn with_stuck_threshold(mut self, threshold: Duration) -> Self {
        self.config.stuck_threshold = threshold;
        self
    }

    /// Set the module search path hint.
    pub fn with_module_path(mut self, path: impl Into<String>) -> Self {
        self.config.module_path = Some(path.into());
        self
    }

    /// Set the bootstrap command hint.
    pub fn with_bootstrap(mut self, command: impl Into<String>) -> Self {
        self.config.bootstrap = Some(command.into());
        self
    }

    /// Set the daemon pid-file hint.
    pub fn with_daemon(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.daemon = Some(path.into());
        self
    }

    /// Set the logger output file hint.
    pub fn with_logger_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.logger_output = Some(path.into());
        self
    }

    /// Seed one env table entry.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.environment.insert(key.into(), value.into());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<NodeConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
