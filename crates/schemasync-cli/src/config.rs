//! Command-line arguments and their configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use schemasync_client::config::DEFAULT_BASE_URL;
use schemasync_client::ClientConfig;
use schemasync_sync::SyncConfig;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default debounce window in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Default watcher poll interval in milliseconds.
pub const DEFAULT_POLL_MS: u64 = 500;

/// Keep a backend's collections in step with local schema files.
#[derive(Parser, Debug)]
#[command(name = "schemasync")]
#[command(version, about = "Schema sync for PocketBase-style backends", long_about = None)]
pub struct Args {
    /// Backend base URL.
    #[arg(long, env = "SCHEMASYNC_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Admin identity (email).
    #[arg(long, env = "SCHEMASYNC_IDENTITY")]
    pub identity: Option<String>,

    /// Admin password.
    #[arg(long, env = "SCHEMASYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Pre-issued admin token; skips password authentication.
    #[arg(long, env = "SCHEMASYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Project root.
    #[arg(short = 'C', long, default_value = ".")]
    pub project: PathBuf,

    /// Schema file or directory (repeatable, relative to the project root).
    #[arg(long = "schema")]
    pub schema: Vec<PathBuf>,

    /// Script asset directory (repeatable, relative to the project root).
    #[arg(long = "scripts")]
    pub scripts: Vec<PathBuf>,

    /// Directory for generated migration files.
    #[arg(long)]
    pub migrations: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Debounce window in milliseconds.
    #[arg(long, default_value_t = DEFAULT_DEBOUNCE_MS)]
    pub debounce_ms: u64,

    /// File watcher poll interval in milliseconds.
    #[arg(long, default_value_t = DEFAULT_POLL_MS)]
    pub poll_ms: u64,

    /// Plan and report only; never change the backend.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the sync cycle at start-up in `dev` mode.
    #[arg(long)]
    pub no_initial_sync: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sync once, then watch for changes until interrupted.
    Dev,
    /// Run a single sync cycle.
    Sync,
    /// Show the migration plan without applying it.
    Plan {
        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Configuration for a command run.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Backend client settings.
    pub client: ClientConfig,
    /// Sync engine settings.
    pub sync: SyncConfig,
}

impl Args {
    /// Convert command-line arguments to configuration.
    pub fn into_config(self) -> CliConfig {
        let mut client = ClientConfig::new(self.url)
            .with_timeout(Duration::from_secs(self.timeout));
        if let (Some(identity), Some(password)) = (self.identity, self.password) {
            client = client.with_credentials(identity, password);
        }
        if let Some(token) = self.token {
            client = client.with_token(token);
        }

        let project = self.project;
        let mut sync = SyncConfig::new(&project)
            .with_debounce(Duration::from_millis(self.debounce_ms))
            .with_poll_interval(Duration::from_millis(self.poll_ms))
            .with_initial_sync(!self.no_initial_sync)
            .with_dry_run(self.dry_run);
        if !self.schema.is_empty() {
            sync = sync.with_schema_roots(resolve_all(&project, self.schema));
        }
        if !self.scripts.is_empty() {
            sync = sync.with_script_roots(resolve_all(&project, self.scripts));
        }
        if let Some(dir) = self.migrations {
            sync = sync.with_migrations_dir(resolve(&project, dir));
        }

        CliConfig { client, sync }
    }
}

fn resolve(project: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project.join(path)
    }
}

fn resolve_all(project: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.into_iter().map(|p| resolve(project, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("schemasync").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_plan_json() {
        let args = parse(&["plan", "--json"]);
        assert_eq!(args.command, Command::Plan { json: true });
    }

    #[test]
    fn test_paths_resolve_against_project() {
        let args = parse(&[
            "-C",
            "/srv/app",
            "--schema",
            "schema/collections.json",
            "--schema",
            "/etc/extra",
            "--migrations",
            "migrations",
            "sync",
        ]);
        let config = args.into_config();

        assert_eq!(
            config.sync.schema_roots,
            vec![
                PathBuf::from("/srv/app/schema/collections.json"),
                PathBuf::from("/etc/extra")
            ]
        );
        assert_eq!(config.sync.script_roots, vec![PathBuf::from("/srv/app/pb_hooks")]);
        assert_eq!(config.sync.migrations_dir, PathBuf::from("/srv/app/migrations"));
    }

    #[test]
    fn test_timings_and_flags() {
        let config = parse(&[
            "--debounce-ms",
            "50",
            "--poll-ms",
            "100",
            "--timeout",
            "5",
            "--dry-run",
            "--no-initial-sync",
            "dev",
        ])
        .into_config();

        assert_eq!(config.sync.debounce, Duration::from_millis(50));
        assert_eq!(config.sync.poll_interval, Duration::from_millis(100));
        assert_eq!(config.client.timeout, Duration::from_secs(5));
        assert!(config.sync.dry_run);
        assert!(!config.sync.initial_sync);
    }

    #[test]
    fn test_zero_poll_interval_is_usable() {
        let config = parse(&["--poll-ms", "0", "dev"]).into_config();
        assert_eq!(config.sync.poll_interval, schemasync_sync::config::MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["schemasync"]).is_err());
    }
}
