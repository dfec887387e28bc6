//! Classification of watched paths.
//!
//! Schema documents feed the diff engine. Backend script assets (jobs,
//! hooks, commands, queries) never do; their changes are only reported.

use std::path::{Path, PathBuf};

use crate::watch::WatchEventKind;

/// Kind of backend script asset, from its parent directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Scheduled job.
    Job,
    /// Event hook.
    Hook,
    /// Console command.
    Command,
    /// Custom query.
    Query,
}

impl ScriptKind {
    fn from_dir(name: &str) -> Option<Self> {
        match name {
            "jobs" => Some(ScriptKind::Job),
            "hooks" => Some(ScriptKind::Hook),
            "commands" => Some(ScriptKind::Command),
            "queries" => Some(ScriptKind::Query),
            _ => None,
        }
    }

    /// Singular name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptKind::Job => "job",
            ScriptKind::Hook => "hook",
            ScriptKind::Command => "command",
            ScriptKind::Query => "query",
        }
    }
}

impl std::fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a watched path is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    /// Part of the desired schema.
    Schema,
    /// A backend script asset.
    Script(ScriptKind),
    /// Neither.
    Ignored,
}

/// Maps paths to their role.
#[derive(Debug, Clone, Default)]
pub struct PathClassifier {
    schema_roots: Vec<PathBuf>,
    script_roots: Vec<PathBuf>,
}

impl PathClassifier {
    /// Create a classifier.
    pub fn new(schema_roots: Vec<PathBuf>, script_roots: Vec<PathBuf>) -> Self {
        Self {
            schema_roots,
            script_roots,
        }
    }

    /// Classify a path.
    pub fn classify(&self, path: &Path) -> PathRole {
        if self.is_schema(path) {
            return PathRole::Schema;
        }
        match self.script_kind(path) {
            Some(kind) => PathRole::Script(kind),
            None => PathRole::Ignored,
        }
    }

    fn is_schema(&self, path: &Path) -> bool {
        self.schema_roots.iter().any(|root| {
            path == root || (path.starts_with(root) && has_extension(path, &["json"]))
        })
    }

    fn script_kind(&self, path: &Path) -> Option<ScriptKind> {
        if !has_extension(path, &["js", "ts"]) {
            return None;
        }
        if !self.script_roots.iter().any(|root| path.starts_with(root)) {
            return None;
        }
        let parent = path.parent()?.file_name()?.to_str()?;
        ScriptKind::from_dir(parent)
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// A script asset change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetChange {
    /// What happened.
    pub kind: WatchEventKind,
    /// Script kind.
    pub script_kind: ScriptKind,
    /// File affected.
    pub path: PathBuf,
}

/// Receives script asset changes.
pub trait AssetReporter: Send + Sync {
    /// Report one change.
    fn report(&self, change: &AssetChange);
}

/// Reports asset changes through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAssetReporter;

impl AssetReporter for LogAssetReporter {
    fn report(&self, change: &AssetChange) {
        tracing::info!(
            event = %change.kind,
            script = %change.script_kind,
            path = %change.path.display(),
            "script asset changed; deploy it to the backend"
        );
    }
}
