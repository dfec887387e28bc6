//! The file-change-driven sync loop.
//!
//! One loop owns the event receiver. Watch events are debounced, schema
//! paths are hashed so that saves without content changes are ignored, and a
//! real change runs one sync cycle:
//!
//! ```text
//! load desired -> fetch current -> diff -> apply safe -> write artifact
//! ```
//!
//! Events arriving while a cycle runs stay queued in the channel and are
//! drained once it finishes.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use schemasync_core::{
    parse_document, Backend, BackendError, MigrationArtifact, MigrationPlan, SchemaDefinition,
    SchemaDiff,
};
use tokio::sync::{broadcast, mpsc, watch};

use crate::apply::ApplyOrchestrator;
use crate::assets::{AssetChange, AssetReporter, LogAssetReporter, PathClassifier, PathRole};
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::fs::Filesystem;
use crate::watch::{WatchEvent, WatchEventKind};

/// Sync loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for changes.
    Idle,
    /// A cycle is running.
    Syncing,
    /// The loop has shut down.
    Stopped,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::Syncing => write!(f, "syncing"),
            SyncState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of one sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Summaries of applied operations.
    pub applied: Vec<String>,
    /// Summaries of failed operations with the backend's error text.
    pub failed: Vec<(String, String)>,
    /// Summaries of unsafe operations left for a migration.
    pub deferred: Vec<String>,
    /// Safe operations that a dry run would have applied.
    pub pending: Vec<String>,
    /// Migration artifact written for the deferred operations.
    pub artifact: Option<PathBuf>,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

impl CycleReport {
    /// One-line summary.
    pub fn summary_line(&self) -> String {
        if self.dry_run {
            format!(
                "dry run: would apply {}, deferred {} unsafe",
                self.pending.len(),
                self.deferred.len()
            )
        } else {
            format!(
                "applied {}, failed {}, deferred {} unsafe",
                self.applied.len(),
                self.failed.len(),
                self.deferred.len()
            )
        }
    }

    /// Check if no operation failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Check if the cycle found nothing to do.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
            && self.failed.is_empty()
            && self.deferred.is_empty()
            && self.pending.is_empty()
    }
}

/// Keeps a backend in step with local schema files.
pub struct SyncLoop {
    config: SyncConfig,
    backend: Arc<dyn Backend>,
    fs: Arc<dyn Filesystem>,
    reporter: Arc<dyn AssetReporter>,
    classifier: PathClassifier,
    orchestrator: ApplyOrchestrator,
    state: watch::Sender<SyncState>,
    last_report: watch::Sender<Option<CycleReport>>,
    hashes: HashMap<PathBuf, String>,
}

impl SyncLoop {
    /// Create a sync loop.
    pub fn new(config: SyncConfig, backend: Arc<dyn Backend>, fs: Arc<dyn Filesystem>) -> Self {
        let classifier =
            PathClassifier::new(config.schema_roots.clone(), config.script_roots.clone());
        let orchestrator = ApplyOrchestrator::new(backend.clone(), config.retry.clone());
        let (state, _) = watch::channel(SyncState::Idle);
        let (last_report, _) = watch::channel(None);

        Self {
            config,
            backend,
            fs,
            reporter: Arc::new(LogAssetReporter),
            classifier,
            orchestrator,
            state,
            last_report,
            hashes: HashMap::new(),
        }
    }

    /// Use a custom reporter for script asset changes.
    pub fn with_reporter(mut self, reporter: Arc<dyn AssetReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Subscribe to the report of the latest completed cycle.
    pub fn reports(&self) -> watch::Receiver<Option<CycleReport>> {
        self.last_report.subscribe()
    }

    /// Read, parse and concatenate every schema document.
    ///
    /// Files are read in path order; collection order follows it.
    pub async fn load_desired(&self) -> Result<SchemaDefinition, SyncError> {
        let files = self.schema_files().await?;
        if files.is_empty() {
            return Err(SyncError::NoSchema(self.config.schema_roots.clone()));
        }

        let mut desired = SchemaDefinition::new();
        for path in files {
            let bytes = self
                .fs
                .read_file(&path)
                .await
                .map_err(|e| SyncError::io(&path, e))?;
            let document = parse_document(&bytes).map_err(|e| {
                tracing::warn!(path = %path.display(), error = %e, "invalid schema document");
                e
            })?;
            desired.collections.extend(document.collections);
        }

        desired.normalize()?;
        Ok(desired)
    }

    /// Compute the plan that would bring the backend to the desired schema.
    ///
    /// The desired schema is validated before the backend is contacted.
    pub async fn plan(&self) -> Result<MigrationPlan, SyncError> {
        let desired = self.load_desired().await?;

        self.config
            .retry
            .execute(|_| self.backend.authenticate())
            .await
            .result
            .map_err(SyncError::Connectivity)?;

        let current = self
            .config
            .retry
            .execute(|_| self.backend.fetch_current_schema())
            .await
            .result
            .map_err(SyncError::Connectivity)?;

        Ok(SchemaDiff::compute(&desired, &current)?)
    }

    /// Run one sync cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        self.state.send_replace(SyncState::Syncing);
        let result = self.cycle().await;
        self.state.send_replace(SyncState::Idle);

        match &result {
            Ok(report) if report.is_success() => {
                tracing::info!(dry_run = report.dry_run, "sync cycle: {}", report.summary_line())
            }
            Ok(report) => {
                tracing::warn!(dry_run = report.dry_run, "sync cycle: {}", report.summary_line())
            }
            Err(e) => tracing::error!(error = %e, "sync cycle failed"),
        }
        if let Ok(report) = &result {
            self.last_report.send_replace(Some(report.clone()));
        }

        result
    }

    async fn cycle(&self) -> Result<CycleReport, SyncError> {
        let (safe, unsafe_ops) = self.plan().await?.into_parts();

        let mut report = CycleReport {
            deferred: unsafe_ops.iter().map(|op| op.summary().to_string()).collect(),
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        if self.config.dry_run {
            report.pending = safe.iter().map(|op| op.summary().to_string()).collect();
            return Ok(report);
        }

        let applied = self.orchestrator.apply(&safe).await;
        report.applied = applied
            .applied
            .iter()
            .map(|op| op.summary().to_string())
            .collect();
        report.failed = applied
            .failed
            .iter()
            .map(|f| (f.operation.summary().to_string(), error_text(&f.error)))
            .collect();

        if let Some(artifact) = MigrationArtifact::render_now(&unsafe_ops) {
            let path = self.config.migrations_dir.join(&artifact.file_name);
            self.fs
                .write_file(&path, artifact.contents.as_bytes())
                .await
                .map_err(|e| SyncError::io(&path, e))?;
            tracing::warn!(
                path = %path.display(),
                operations = unsafe_ops.len(),
                "unsafe changes written to a migration file for review"
            );
            report.artifact = Some(path);
        }

        Ok(report)
    }

    /// Process watch events until shutdown or until the event channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<WatchEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        self.prime_hashes().await;

        if self.config.initial_sync && !shutdown_requested(&mut shutdown) {
            let _ = self.run_cycle().await;
        }

        'outer: loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => {
                        tracing::debug!("event channel closed");
                        break;
                    }
                },
            };

            let batch = self.collect_batch(first, &mut events).await;
            let mut changed = self.process_batch(batch).await;

            while changed {
                if shutdown_requested(&mut shutdown) {
                    break 'outer;
                }
                let _ = self.run_cycle().await;

                let mut queued = BTreeMap::new();
                while let Ok(event) = events.try_recv() {
                    coalesce(&mut queued, event);
                }
                changed = self.process_batch(queued).await;
            }
        }

        drop(events);
        self.state.send_replace(SyncState::Stopped);
        tracing::info!("sync loop stopped");
    }

    async fn schema_files(&self) -> Result<Vec<PathBuf>, SyncError> {
        let mut files = Vec::new();
        for root in &self.config.schema_roots {
            let listed = self
                .fs
                .list_files(root)
                .await
                .map_err(|e| SyncError::io(root, e))?;
            files.extend(
                listed
                    .into_iter()
                    .filter(|p| self.classifier.classify(p) == PathRole::Schema),
            );
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    async fn prime_hashes(&mut self) {
        let files = match self.schema_files().await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list schema files");
                return;
            }
        };
        for path in files {
            if let Ok(bytes) = self.fs.read_file(&path).await {
                self.hashes.insert(path, content_hash(&bytes));
            }
        }
    }

    async fn collect_batch(
        &self,
        first: WatchEvent,
        events: &mut mpsc::Receiver<WatchEvent>,
    ) -> BTreeMap<PathBuf, WatchEventKind> {
        let mut batch = BTreeMap::new();
        coalesce(&mut batch, first);

        let deadline = tokio::time::Instant::now() + self.config.debounce;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
            coalesce(&mut batch, event);
        }

        batch
    }

    /// Returns true when the batch holds a real schema change.
    async fn process_batch(&mut self, batch: BTreeMap<PathBuf, WatchEventKind>) -> bool {
        let mut changed = false;

        for (path, kind) in batch {
            match self.classifier.classify(&path) {
                PathRole::Schema => {
                    if self.refresh_hash(&path, kind).await {
                        tracing::debug!(path = %path.display(), event = %kind, "schema changed");
                        changed = true;
                    }
                }
                PathRole::Script(script_kind) => self.reporter.report(&AssetChange {
                    kind,
                    script_kind,
                    path,
                }),
                PathRole::Ignored => {
                    tracing::trace!(path = %path.display(), "ignoring file event")
                }
            }
        }

        changed
    }

    async fn refresh_hash(&mut self, path: &Path, kind: WatchEventKind) -> bool {
        if kind == WatchEventKind::Unlink {
            return self.hashes.remove(path).is_some();
        }

        match self.fs.read_file(path).await {
            Ok(bytes) => {
                let hash = content_hash(&bytes);
                self.hashes.insert(path.to_path_buf(), hash.clone()).as_ref() != Some(&hash)
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "schema file unreadable");
                self.hashes.remove(path).is_some()
            }
        }
    }
}

fn coalesce(batch: &mut BTreeMap<PathBuf, WatchEventKind>, event: WatchEvent) {
    match batch.get(&event.path) {
        Some(WatchEventKind::Add) if event.kind == WatchEventKind::Change => {}
        _ => {
            batch.insert(event.path, event.kind);
        }
    }
}

fn shutdown_requested(shutdown: &mut broadcast::Receiver<()>) -> bool {
    !matches!(
        shutdown.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    )
}

fn content_hash(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

fn error_text(err: &BackendError) -> String {
    match err {
        BackendError::Rejected { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
