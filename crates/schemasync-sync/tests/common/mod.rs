//! Shared fixtures for sync integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use schemasync_core::{
    replay, Backend, BackendError, MigrationOperation, OperationKind, SchemaDefinition,
};

/// Backend that keeps its schema in memory and applies operations with the
/// replayer.
#[derive(Default)]
pub struct InMemoryBackend {
    schema: Mutex<SchemaDefinition>,
    rate_limit_applies: bool,
    unreachable: bool,
    failing: Mutex<HashSet<String>>,
    next_id: AtomicU32,
    pub apply_calls: AtomicU32,
    pub fetch_calls: AtomicU32,
    applied: Mutex<Vec<OperationKind>>,
}

impl InMemoryBackend {
    pub fn new(schema: SchemaDefinition) -> Self {
        Self {
            schema: Mutex::new(schema),
            ..Default::default()
        }
    }

    /// Every apply call answers 429.
    pub fn always_rate_limited(mut self) -> Self {
        self.rate_limit_applies = true;
        self
    }

    /// Every call fails as unreachable.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Reject operations whose summary contains `needle`.
    pub fn failing_on(self, needle: &str) -> Self {
        self.failing.lock().insert(needle.to_string());
        self
    }

    pub fn schema(&self) -> SchemaDefinition {
        self.schema.lock().clone()
    }

    pub fn applied_kinds(&self) -> Vec<OperationKind> {
        self.applied.lock().clone()
    }

    pub fn apply_count(&self) -> u32 {
        self.apply_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn authenticate(&self) -> Result<(), BackendError> {
        if self.unreachable {
            return Err(BackendError::Unreachable("connection refused".into()));
        }
        Ok(())
    }

    async fn fetch_current_schema(&self) -> Result<SchemaDefinition, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreachable {
            return Err(BackendError::Unreachable("connection refused".into()));
        }
        Ok(self.schema())
    }

    async fn apply_operation(&self, operation: &MigrationOperation) -> Result<(), BackendError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        if self.rate_limit_applies {
            return Err(BackendError::RateLimited("too many requests".into()));
        }
        if self
            .failing
            .lock()
            .iter()
            .any(|needle| operation.summary().contains(needle.as_str()))
        {
            return Err(BackendError::Rejected {
                status: Some(400),
                message: "Failed to save collection.".into(),
            });
        }

        let mut schema = self.schema.lock();
        replay(&mut schema, operation).map_err(|e| BackendError::rejected(e.to_string()))?;
        if operation.kind() == OperationKind::CreateCollection {
            let id = format!("pbc_{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            if let Some(created) = operation
                .collection()
                .and_then(|name| schema.get_mut(name))
            {
                created.id.get_or_insert(id);
            }
        }
        self.applied.lock().push(operation.kind());
        Ok(())
    }
}

pub fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub const USERS: &str = r#"[
  {
    "name": "users",
    "type": "auth",
    "schema": [
      {"name": "name", "type": "text", "options": {"max": 100}},
      {"name": "email", "type": "email", "required": true, "unique": true}
    ],
    "listRule": ""
  }
]"#;

pub const POSTS: &str = r#"[
  {
    "name": "posts",
    "schema": [
      {"name": "title", "type": "text", "required": true},
      {"name": "status", "type": "select", "options": {"values": ["draft", "published"], "maxSelect": 1}}
    ],
    "indexes": ["CREATE INDEX idx_posts_title ON posts (title)"]
  }
]"#;
