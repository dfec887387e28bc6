//! Schema definitions and their name-keyed normalized form.

use super::{Collection, Field};
use crate::error::Error;
use serde::Serialize;
use std::collections::HashMap;

/// An ordered list of collections describing a backend's shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaDefinition {
    /// Collections in document order.
    pub collections: Vec<Collection>,
}

impl SchemaDefinition {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a collection.
    pub fn with_collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);
        self
    }

    /// Get a collection by name.
    pub fn get(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Get a mutable collection by name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.iter_mut().find(|c| c.name == name)
    }

    /// Number of collections.
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// Check if the schema has no collections.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Build the name-keyed form, rejecting empty or duplicate collection and
    /// field names.
    pub fn normalize(&self) -> Result<NameMap<'_, Collection>, Error> {
        let collections = NameMap::build(
            self.collections.iter().map(|c| (c.name.as_str(), c)),
            |name| format!("duplicate collection name '{}'", name),
            || "collection with empty name".to_string(),
        )?;

        for collection in &self.collections {
            normalize_fields(collection)?;
        }

        Ok(collections)
    }
}

/// Build the name-keyed field map of a collection.
pub fn normalize_fields(collection: &Collection) -> Result<NameMap<'_, Field>, Error> {
    NameMap::build(
        collection.fields.iter().map(|f| (f.name.as_str(), f)),
        |name| {
            format!(
                "duplicate field name '{}' in collection '{}'",
                name, collection.name
            )
        },
        || format!("field with empty name in collection '{}'", collection.name),
    )
}

/// Name-keyed view over a list, remembering the original order.
#[derive(Debug)]
pub struct NameMap<'a, T> {
    order: Vec<&'a str>,
    items: HashMap<&'a str, &'a T>,
}

impl<'a, T> NameMap<'a, T> {
    fn build<I, D, E>(entries: I, duplicate: D, empty: E) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (&'a str, &'a T)>,
        D: Fn(&str) -> String,
        E: Fn() -> String,
    {
        let mut order = Vec::new();
        let mut items = HashMap::new();

        for (name, item) in entries {
            if name.trim().is_empty() {
                return Err(Error::validation(empty()));
            }
            if items.insert(name, item).is_some() {
                return Err(Error::validation(duplicate(name)));
            }
            order.push(name);
        }

        Ok(Self { order, items })
    }

    /// Get an entry by name.
    pub fn get(&self, name: &str) -> Option<&'a T> {
        self.items.get(name).copied()
    }

    /// Check if a name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Names in original order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
