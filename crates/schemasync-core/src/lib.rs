//! schemasync core - schema model, document codec and migration planning.
//!
//! This crate is pure: it performs no I/O and owns no runtime. The sync
//! engine and the REST client build on the types defined here.

pub mod backend;
pub mod document;
pub mod error;
pub mod migration;
pub mod schema;

pub use backend::{Backend, BackendError};
pub use document::{
    from_backend_collections, overlay_collection, parse_document, render_document, RawCollection,
    RawField,
};
pub use error::Error;
pub use migration::{
    classify_field, replay, FieldClassification, MigrationArtifact, MigrationOperation,
    MigrationPlan, OperationKind, OperationPayload, SchemaDiff,
};
pub use schema::{Collection, CollectionKind, Field, FieldKind, RuleSlot, Rules, SchemaDefinition};
