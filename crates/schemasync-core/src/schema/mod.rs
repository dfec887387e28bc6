//! Schema model for schemasync.
//!
//! A schema is an ordered list of collections; each collection owns its
//! fields, index definitions and access rules. Names are the natural keys
//! used when comparing two schemas.

mod collection;
mod definition;
mod field;
mod rules;

pub use collection::{Collection, CollectionKind};
pub use definition::{normalize_fields, NameMap, SchemaDefinition};
pub use field::{
    DateOptions, DomainOptions, Field, FieldKind, FileOptions, JsonOptions, NumberOptions,
    RelationOptions, SelectOptions, TextOptions,
};
pub use rules::{RuleSlot, Rules};
