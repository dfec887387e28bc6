//! Schema diffing algorithm.
//!
//! Compares the desired schema with the backend's current schema and
//! produces a [`MigrationPlan`] of atomic operations, each already
//! classified as safe or unsafe.

use super::classify::classify_field;
use super::operation::MigrationOperation;
use super::plan::{MigrationPlan, Safety};
use crate::error::Error;
use crate::schema::{normalize_fields, Collection, SchemaDefinition};

/// Diff engine entry point.
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compute the plan that transforms `current` into `desired`.
    ///
    /// Fails only if either schema does not normalize.
    pub fn compute(
        desired: &SchemaDefinition,
        current: &SchemaDefinition,
    ) -> Result<MigrationPlan, Error> {
        let desired_map = desired.normalize()?;
        let current_map = current.normalize()?;

        let mut plan = MigrationPlan::new();

        for name in desired_map.names() {
            let Some(wanted) = desired_map.get(name) else {
                continue;
            };
            match current_map.get(name) {
                None => plan.push(
                    Safety::Safe,
                    MigrationOperation::create_collection(wanted),
                ),
                Some(existing) => Self::diff_collection(wanted, existing, &mut plan)?,
            }
        }

        for name in current_map.names() {
            if desired_map.contains(name) {
                continue;
            }
            if let Some(existing) = current_map.get(name) {
                plan.push(
                    Safety::Unsafe,
                    MigrationOperation::delete_collection(existing),
                );
            }
        }

        tracing::debug!(
            safe = plan.safe().len(),
            unsafe_ops = plan.unsafe_ops().len(),
            "computed migration plan"
        );

        Ok(plan)
    }

    fn diff_collection(
        desired: &Collection,
        current: &Collection,
        plan: &mut MigrationPlan,
    ) -> Result<(), Error> {
        if desired.fingerprint()? == current.fingerprint()? {
            return Ok(());
        }

        let name = desired.name.as_str();

        if desired.kind != current.kind {
            plan.push(
                Safety::Unsafe,
                MigrationOperation::update_collection(current, desired),
            );
        }

        let changed_slots = desired.rules.differing_slots(&current.rules);
        if !changed_slots.is_empty() {
            plan.push(
                Safety::Safe,
                MigrationOperation::update_rules(name, &desired.rules, &changed_slots),
            );
        }

        let desired_indexes = desired.index_set();
        let current_indexes = current.index_set();

        for index in current_indexes.difference(&desired_indexes) {
            plan.push(Safety::Unsafe, MigrationOperation::delete_index(name, index));
        }

        Self::diff_fields(desired, current, plan)?;

        for index in desired_indexes.difference(&current_indexes) {
            plan.push(Safety::Safe, MigrationOperation::add_index(name, index));
        }

        Ok(())
    }

    fn diff_fields(
        desired: &Collection,
        current: &Collection,
        plan: &mut MigrationPlan,
    ) -> Result<(), Error> {
        let desired_fields = normalize_fields(desired)?;
        let current_fields = normalize_fields(current)?;
        let name = desired.name.as_str();

        for field_name in desired_fields.names() {
            let Some(wanted) = desired_fields.get(field_name) else {
                continue;
            };
            let Some(existing) = current_fields.get(field_name) else {
                plan.push(Safety::Safe, MigrationOperation::add_field(name, wanted));
                continue;
            };

            let classification = classify_field(existing, wanted);
            if let Some(kind) = classification.operation_kind() {
                let safety = if classification.is_unsafe {
                    Safety::Unsafe
                } else {
                    Safety::Safe
                };
                plan.push(
                    safety,
                    MigrationOperation::update_field(
                        kind,
                        name,
                        existing,
                        wanted,
                        classification.changes,
                    ),
                );
            }
        }

        for field_name in current_fields.names() {
            if desired_fields.contains(field_name) {
                continue;
            }
            if let Some(existing) = current_fields.get(field_name) {
                plan.push(
                    Safety::Unsafe,
                    MigrationOperation::delete_field(name, existing),
                );
            }
        }

        Ok(())
    }
}
