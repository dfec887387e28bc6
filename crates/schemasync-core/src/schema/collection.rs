//! Collection definitions.

use super::{Field, Rules};
use crate::error::Error;
use serde::Serialize;
use std::collections::BTreeSet;

/// Kind of collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Plain record collection.
    #[default]
    Base,
    /// Collection whose records can authenticate.
    Auth,
}

impl CollectionKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Base => "base",
            CollectionKind::Auth => "auth",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collection definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    /// Backend-assigned identity, present once the collection exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Collection name, the natural key across diffs.
    pub name: String,
    /// Collection kind.
    pub kind: CollectionKind,
    /// Field definitions in document order.
    pub fields: Vec<Field>,
    /// Index definitions (opaque DDL strings).
    pub indexes: Vec<String>,
    /// Access rules.
    pub rules: Rules,
}

impl Collection {
    /// Create an empty base collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind: CollectionKind::Base,
            fields: Vec::new(),
            indexes: Vec::new(),
            rules: Rules::default(),
        }
    }

    /// Create an empty auth collection.
    pub fn auth(name: impl Into<String>) -> Self {
        Self {
            kind: CollectionKind::Auth,
            ..Self::new(name)
        }
    }

    /// Set the backend identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Add an index definition.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.indexes.push(index.into());
        self
    }

    /// Set the access rules.
    pub fn with_rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a mutable field by name.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    /// Check whether an index is defined, ignoring surrounding whitespace.
    pub fn has_index(&self, index: &str) -> bool {
        let index = index.trim();
        self.indexes.iter().any(|i| i.trim() == index)
    }

    /// Index definitions as a trimmed set.
    pub fn index_set(&self) -> BTreeSet<&str> {
        self.indexes.iter().map(|i| i.trim()).collect()
    }

    /// Hash of the collection shape, ignoring backend ids, field order and
    /// index order.
    pub fn fingerprint(&self) -> Result<String, Error> {
        let mut fields: Vec<Field> = self.fields.iter().map(Field::without_id).collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));

        let canonical = CanonicalCollection {
            name: &self.name,
            kind: self.kind,
            fields,
            indexes: self.index_set(),
            rules: &self.rules,
        };

        let mut hasher = blake3::Hasher::new();
        serde_json::to_writer(&mut hasher, &canonical)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(hex::encode(hasher.finalize().as_bytes()))
    }
}

#[derive(Serialize)]
struct CanonicalCollection<'a> {
    name: &'a str,
    kind: CollectionKind,
    fields: Vec<Field>,
    indexes: BTreeSet<&'a str>,
    rules: &'a Rules,
}
