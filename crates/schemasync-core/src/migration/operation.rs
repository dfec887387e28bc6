//! Atomic migration operations.
//!
//! Operations are produced by the diff engine and never mutated afterwards;
//! fields are private and only readable through accessors.

use crate::schema::{Collection, Field, RuleSlot, Rules};
use serde::Serialize;

/// Kind of a migration operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    /// Create a new collection.
    CreateCollection,
    /// Change collection-level properties (its kind).
    UpdateCollection,
    /// Delete a collection and its records.
    DeleteCollection,
    /// Add a field.
    AddField,
    /// Update a field without risk to existing data.
    UpdateField,
    /// Delete a field and its values.
    DeleteField,
    /// Rename a field. Never planned by [`SchemaDiff`](super::SchemaDiff).
    RenameField,
    /// Add an index.
    AddIndex,
    /// Remove an index.
    DeleteIndex,
    /// Replace access rules.
    UpdateRules,
    /// Change the type of a field.
    TypeChange,
    /// Update a field in a way that may violate existing data.
    UnsafeFieldUpdate,
}

impl OperationKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateCollection => "createCollection",
            OperationKind::UpdateCollection => "updateCollection",
            OperationKind::DeleteCollection => "deleteCollection",
            OperationKind::AddField => "addField",
            OperationKind::UpdateField => "updateField",
            OperationKind::DeleteField => "deleteField",
            OperationKind::RenameField => "renameField",
            OperationKind::AddIndex => "addIndex",
            OperationKind::DeleteIndex => "deleteIndex",
            OperationKind::UpdateRules => "updateRules",
            OperationKind::TypeChange => "typeChange",
            OperationKind::UnsafeFieldUpdate => "unsafeFieldUpdate",
        }
    }

    /// Kinds that the diff engine only ever classifies as unsafe.
    pub fn is_unsafe_only(&self) -> bool {
        matches!(
            self,
            OperationKind::UpdateCollection
                | OperationKind::DeleteCollection
                | OperationKind::DeleteField
                | OperationKind::DeleteIndex
                | OperationKind::TypeChange
                | OperationKind::UnsafeFieldUpdate
        )
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data carried by an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum OperationPayload {
    /// A full collection definition.
    Collection(Collection),
    /// A full field definition.
    Field(Field),
    /// A field before and after an update.
    FieldUpdate {
        /// Field as the backend has it.
        from: Field,
        /// Field as desired.
        to: Field,
        /// Human-readable list of changes.
        changes: Vec<String>,
    },
    /// A field rename.
    FieldRename {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
    /// An index definition.
    Index(String),
    /// A full desired rule set.
    Rules(Rules),
}

/// A single atomic schema change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOperation {
    kind: OperationKind,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    payload: OperationPayload,
    requires_data_migration: bool,
}

impl MigrationOperation {
    fn new(
        kind: OperationKind,
        summary: String,
        collection: &str,
        field: Option<&str>,
        payload: OperationPayload,
    ) -> Self {
        Self {
            kind,
            summary,
            collection: Some(collection.to_string()),
            field: field.map(str::to_string),
            payload,
            requires_data_migration: false,
        }
    }

    fn with_data_migration(mut self) -> Self {
        self.requires_data_migration = true;
        self
    }

    /// Create a collection.
    pub fn create_collection(collection: &Collection) -> Self {
        Self::new(
            OperationKind::CreateCollection,
            format!("Create collection '{}'", collection.name),
            &collection.name,
            None,
            OperationPayload::Collection(collection.clone()),
        )
    }

    /// Delete a collection, given its current definition.
    pub fn delete_collection(collection: &Collection) -> Self {
        Self::new(
            OperationKind::DeleteCollection,
            format!("Delete collection '{}'", collection.name),
            &collection.name,
            None,
            OperationPayload::Collection(collection.clone()),
        )
        .with_data_migration()
    }

    /// Change the kind of a collection.
    pub fn update_collection(current: &Collection, desired: &Collection) -> Self {
        Self::new(
            OperationKind::UpdateCollection,
            format!(
                "Change type of collection '{}' from {} to {}",
                desired.name, current.kind, desired.kind
            ),
            &desired.name,
            None,
            OperationPayload::Collection(desired.clone()),
        )
        .with_data_migration()
    }

    /// Add a field to a collection.
    pub fn add_field(collection: &str, field: &Field) -> Self {
        Self::new(
            OperationKind::AddField,
            format!("Add field '{}' to collection '{}'", field.name, collection),
            collection,
            Some(&field.name),
            OperationPayload::Field(field.clone()),
        )
    }

    /// Delete a field, given its current definition.
    pub fn delete_field(collection: &str, field: &Field) -> Self {
        Self::new(
            OperationKind::DeleteField,
            format!(
                "Remove field '{}' from collection '{}'",
                field.name, collection
            ),
            collection,
            Some(&field.name),
            OperationPayload::Field(field.clone()),
        )
        .with_data_migration()
    }

    /// Update a field.
    ///
    /// `kind` must be one of the field update kinds; unsafe updates are
    /// flagged as requiring a data migration.
    pub fn update_field(
        kind: OperationKind,
        collection: &str,
        from: &Field,
        to: &Field,
        changes: Vec<String>,
    ) -> Self {
        let verb = match kind {
            OperationKind::TypeChange => "Change type of",
            _ => "Update",
        };
        let op = Self::new(
            kind,
            format!(
                "{} field '{}' in collection '{}' ({})",
                verb,
                to.name,
                collection,
                changes.join(", ")
            ),
            collection,
            Some(&to.name),
            OperationPayload::FieldUpdate {
                from: from.clone(),
                to: to.clone(),
                changes,
            },
        );

        if kind.is_unsafe_only() {
            op.with_data_migration()
        } else {
            op
        }
    }

    /// Rename a field.
    ///
    /// The diff cannot tell a rename from a removal plus an addition, so it
    /// never emits this; it exists for callers building plans by hand and is
    /// honoured by [`replay`](super::replay).
    pub fn rename_field(collection: &str, from: &str, to: &str) -> Self {
        Self::new(
            OperationKind::RenameField,
            format!(
                "Rename field '{}' to '{}' in collection '{}'",
                from, to, collection
            ),
            collection,
            Some(from),
            OperationPayload::FieldRename {
                from: from.to_string(),
                to: to.to_string(),
            },
        )
    }

    /// Add an index.
    pub fn add_index(collection: &str, index: &str) -> Self {
        Self::new(
            OperationKind::AddIndex,
            format!("Add index to collection '{}': {}", collection, one_line(index)),
            collection,
            None,
            OperationPayload::Index(index.trim().to_string()),
        )
    }

    /// Remove an index.
    pub fn delete_index(collection: &str, index: &str) -> Self {
        Self::new(
            OperationKind::DeleteIndex,
            format!(
                "Remove index from collection '{}': {}",
                collection,
                one_line(index)
            ),
            collection,
            None,
            OperationPayload::Index(index.trim().to_string()),
        )
    }

    /// Replace the access rules of a collection with the desired set.
    pub fn update_rules(collection: &str, rules: &Rules, changed: &[RuleSlot]) -> Self {
        let slots: Vec<&str> = changed.iter().map(RuleSlot::as_str).collect();
        Self::new(
            OperationKind::UpdateRules,
            format!(
                "Update access rules for collection '{}' ({})",
                collection,
                slots.join(", ")
            ),
            collection,
            None,
            OperationPayload::Rules(rules.clone()),
        )
    }

    /// Operation kind.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// One-line human-readable description.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Target collection name.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// Target field name.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Operation payload.
    pub fn payload(&self) -> &OperationPayload {
        &self.payload
    }

    /// Whether existing records need a manual data migration.
    pub fn requires_data_migration(&self) -> bool {
        self.requires_data_migration
    }
}

impl std::fmt::Display for MigrationOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary)
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
