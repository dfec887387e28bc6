//! schemasync sync engine.
//!
//! Builds on `schemasync-core` to keep a live backend in step with local
//! schema files:
//! - [`RetryPolicy`] absorbs rate limiting
//! - [`ApplyOrchestrator`] applies safe operations in order
//! - [`PollingWatcher`] turns file changes into events
//! - [`SyncLoop`] debounces events and runs sync cycles

pub mod apply;
pub mod assets;
pub mod config;
pub mod error;
pub mod fs;
pub mod retry;
pub mod sync_loop;
pub mod watch;

pub use apply::{ApplyOrchestrator, ApplyReport, FailedOperation};
pub use assets::{AssetChange, AssetReporter, LogAssetReporter, PathClassifier, PathRole, ScriptKind};
pub use config::SyncConfig;
pub use error::SyncError;
pub use fs::{Filesystem, LocalFilesystem};
pub use retry::{RetryOutcome, RetryPolicy};
pub use sync_loop::{CycleReport, SyncLoop, SyncState};
pub use watch::{PollingWatcher, WatchEvent, WatchEventKind, WatchHandle};
