//! Sync configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default schema directory, relative to the project root.
pub const DEFAULT_SCHEMA_DIR: &str = "pb_schema";

/// Default script asset directory, relative to the project root.
pub const DEFAULT_SCRIPTS_DIR: &str = "pb_hooks";

/// Default migrations directory, relative to the project root.
pub const DEFAULT_MIGRATIONS_DIR: &str = "pb_migrations";

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Default watcher poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Shortest watcher poll interval; shorter requests are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Sync loop configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Files or directories holding schema documents.
    pub schema_roots: Vec<PathBuf>,

    /// Directories holding backend script assets.
    pub script_roots: Vec<PathBuf>,

    /// Where migration artifacts are written.
    pub migrations_dir: PathBuf,

    /// How long to collect further events after the first one.
    pub debounce: Duration,

    /// Watcher poll interval.
    pub poll_interval: Duration,

    /// Run a cycle at start-up before waiting for events.
    pub initial_sync: bool,

    /// Plan and report only; never write to the backend or disk.
    pub dry_run: bool,

    /// Retry policy for backend calls.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Create a configuration with the default layout under `project_root`.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let root = project_root.as_ref();
        Self {
            schema_roots: vec![root.join(DEFAULT_SCHEMA_DIR)],
            script_roots: vec![root.join(DEFAULT_SCRIPTS_DIR)],
            migrations_dir: root.join(DEFAULT_MIGRATIONS_DIR),
            debounce: DEFAULT_DEBOUNCE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            initial_sync: true,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the schema roots.
    pub fn with_schema_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.schema_roots = roots;
        self
    }

    /// Replace the script roots.
    pub fn with_script_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.script_roots = roots;
        self
    }

    /// Set the migrations directory.
    pub fn with_migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the watcher poll interval (at least [`MIN_POLL_INTERVAL`]).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    /// Enable or disable the start-up cycle.
    pub fn with_initial_sync(mut self, enabled: bool) -> Self {
        self.initial_sync = enabled;
        self
    }

    /// Enable or disable dry-run mode.
    pub fn with_dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Every root the watcher should scan.
    pub fn watch_roots(&self) -> Vec<PathBuf> {
        self.schema_roots
            .iter()
            .chain(self.script_roots.iter())
            .cloned()
            .collect()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
