//! Migration planning for schemasync.
//!
//! Planning runs in three steps:
//! - [`SchemaDiff`] compares the desired and current schemas
//! - [`classify_field`] decides whether a field update is safe
//! - the resulting [`MigrationPlan`] splits operations into a safe set that is
//!   applied automatically and an unsafe set rendered as a [`MigrationArtifact`]
//!
//! # Example
//!
//! ```ignore
//! use schemasync_core::migration::{MigrationArtifact, SchemaDiff};
//!
//! let plan = SchemaDiff::compute(&desired, &current)?;
//! for op in plan.safe() {
//!     backend.apply_operation(op).await?;
//! }
//! if let Some(artifact) = MigrationArtifact::render_now(plan.unsafe_ops()) {
//!     std::fs::write(migrations_dir.join(&artifact.file_name), artifact.contents)?;
//! }
//! ```

pub mod artifact;
pub mod classify;
pub mod diff;
pub mod operation;
pub mod plan;
pub mod replay;

pub use artifact::{MigrationArtifact, ARTIFACT_SLUG};
pub use classify::{classify_field, FieldClassification};
pub use diff::SchemaDiff;
pub use operation::{MigrationOperation, OperationKind, OperationPayload};
pub use plan::{MigrationPlan, Safety};
pub use replay::{replay, replay_on_collection};
