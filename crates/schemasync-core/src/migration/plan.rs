//! Migration plans.

use super::operation::MigrationOperation;
use serde::Serialize;

/// Whether an operation may be applied automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Safety {
    /// Non-destructive, auto-applicable.
    Safe,
    /// Potentially destructive, deferred to a reviewed migration.
    Unsafe,
}

/// Operations split into the safe and unsafe sets, each in dependency order.
///
/// Plans are recomputed from scratch on every sync cycle and never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationPlan {
    safe: Vec<MigrationOperation>,
    #[serde(rename = "unsafe")]
    unsafe_ops: Vec<MigrationOperation>,
}

impl MigrationPlan {
    /// Create an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan from already partitioned operations.
    pub fn from_parts(safe: Vec<MigrationOperation>, unsafe_ops: Vec<MigrationOperation>) -> Self {
        Self { safe, unsafe_ops }
    }

    pub(crate) fn push(&mut self, safety: Safety, operation: MigrationOperation) {
        match safety {
            Safety::Safe => self.safe.push(operation),
            Safety::Unsafe => self.unsafe_ops.push(operation),
        }
    }

    /// Operations that can be applied automatically.
    pub fn safe(&self) -> &[MigrationOperation] {
        &self.safe
    }

    /// Operations deferred to a migration artifact.
    pub fn unsafe_ops(&self) -> &[MigrationOperation] {
        &self.unsafe_ops
    }

    /// Split into (safe, unsafe).
    pub fn into_parts(self) -> (Vec<MigrationOperation>, Vec<MigrationOperation>) {
        (self.safe, self.unsafe_ops)
    }

    /// All operations, safe first.
    pub fn operations(&self) -> impl Iterator<Item = (Safety, &MigrationOperation)> {
        self.safe
            .iter()
            .map(|op| (Safety::Safe, op))
            .chain(self.unsafe_ops.iter().map(|op| (Safety::Unsafe, op)))
    }

    /// Total number of operations.
    pub fn len(&self) -> usize {
        self.safe.len() + self.unsafe_ops.len()
    }

    /// Check if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.safe.is_empty() && self.unsafe_ops.is_empty()
    }

    /// Check if every operation can be applied automatically.
    pub fn is_fully_safe(&self) -> bool {
        self.unsafe_ops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Collection, Field, FieldKind};

    #[test]
    fn test_partitioning() {
        let mut plan = MigrationPlan::new();
        assert!(plan.is_empty());

        plan.push(
            Safety::Safe,
            MigrationOperation::create_collection(&Collection::new("posts")),
        );
        plan.push(
            Safety::Unsafe,
            MigrationOperation::delete_field("users", &Field::new("bio", FieldKind::text())),
        );

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.safe().len(), 1);
        assert_eq!(plan.unsafe_ops().len(), 1);
        assert!(!plan.is_fully_safe());

        let safeties: Vec<_> = plan.operations().map(|(s, _)| s).collect();
        assert_eq!(safeties, vec![Safety::Safe, Safety::Unsafe]);
    }

    #[test]
    fn test_plan_serialization_uses_unsafe_key() {
        let plan = MigrationPlan::from_parts(
            Vec::new(),
            vec![MigrationOperation::delete_collection(&Collection::new("legacy"))],
        );
        let value = serde_json::to_value(&plan).unwrap();

        assert_eq!(value["safe"].as_array().unwrap().len(), 0);
        assert_eq!(value["unsafe"][0]["kind"], "deleteCollection");
    }
}
