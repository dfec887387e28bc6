//! Local replay of migration operations.
//!
//! Applies a single operation to an in-memory schema. Used for
//! read-modify-write updates against backends that only accept whole
//! collection documents, and by in-memory backends in tests.

use super::operation::{MigrationOperation, OperationKind, OperationPayload};
use crate::error::Error;
use crate::schema::{Collection, SchemaDefinition};

/// Apply one operation to `schema`.
pub fn replay(schema: &mut SchemaDefinition, operation: &MigrationOperation) -> Result<(), Error> {
    match (operation.kind(), operation.payload()) {
        (OperationKind::CreateCollection, OperationPayload::Collection(collection)) => {
            if schema.get(&collection.name).is_some() {
                return Err(Error::replay(format!(
                    "collection '{}' already exists",
                    collection.name
                )));
            }
            schema.collections.push(collection.clone());
            Ok(())
        }
        (OperationKind::DeleteCollection, OperationPayload::Collection(collection)) => {
            let before = schema.collections.len();
            schema.collections.retain(|c| c.name != collection.name);
            if schema.collections.len() == before {
                return Err(missing_collection(&collection.name));
            }
            Ok(())
        }
        _ => {
            let target = target_collection(schema, operation)?;
            replay_on_collection(target, operation)
        }
    }
}

/// Apply a collection-scoped operation to a single collection.
///
/// Collection creation and deletion are schema-scoped and rejected here.
pub fn replay_on_collection(
    collection: &mut Collection,
    operation: &MigrationOperation,
) -> Result<(), Error> {
    match operation.payload() {
        OperationPayload::Collection(desired) => match operation.kind() {
            OperationKind::UpdateCollection => {
                collection.kind = desired.kind;
                Ok(())
            }
            kind => Err(Error::replay(format!(
                "{} cannot be applied to a single collection",
                kind
            ))),
        },
        OperationPayload::Field(field) => match operation.kind() {
            OperationKind::AddField => {
                if collection.field(&field.name).is_some() {
                    return Err(Error::replay(format!(
                        "field '{}' already exists in collection '{}'",
                        field.name, collection.name
                    )));
                }
                collection.fields.push(field.clone());
                Ok(())
            }
            _ => {
                let before = collection.fields.len();
                collection.fields.retain(|f| f.name != field.name);
                if collection.fields.len() == before {
                    return Err(missing_field(collection, &field.name));
                }
                Ok(())
            }
        },
        OperationPayload::FieldUpdate { to, .. } => {
            let name = collection.name.clone();
            let existing = collection
                .field_mut(&to.name)
                .ok_or_else(|| Error::replay(format!(
                    "field '{}' does not exist in collection '{}'",
                    to.name, name
                )))?;
            let id = existing.id.take();
            *existing = to.clone();
            existing.id = id.or_else(|| to.id.clone());
            Ok(())
        }
        OperationPayload::FieldRename { from, to } => {
            if collection.field(to).is_some() {
                return Err(Error::replay(format!(
                    "field '{}' already exists in collection '{}'",
                    to, collection.name
                )));
            }
            let name = collection.name.clone();
            let field = collection
                .field_mut(from)
                .ok_or_else(|| Error::replay(format!(
                    "field '{}' does not exist in collection '{}'",
                    from, name
                )))?;
            field.name = to.clone();
            Ok(())
        }
        OperationPayload::Index(index) => match operation.kind() {
            OperationKind::AddIndex => {
                if !collection.has_index(index) {
                    collection.indexes.push(index.clone());
                }
                Ok(())
            }
            _ => {
                let before = collection.indexes.len();
                collection.indexes.retain(|i| i.trim() != index.trim());
                if collection.indexes.len() == before {
                    return Err(Error::replay(format!(
                        "index not found in collection '{}': {}",
                        collection.name, index
                    )));
                }
                Ok(())
            }
        },
        OperationPayload::Rules(rules) => {
            rules.merge_into(&mut collection.rules);
            Ok(())
        }
    }
}

fn target_collection<'a>(
    schema: &'a mut SchemaDefinition,
    operation: &MigrationOperation,
) -> Result<&'a mut Collection, Error> {
    let name = operation
        .collection()
        .ok_or_else(|| Error::replay(format!("{} has no target collection", operation.kind())))?;
    schema
        .get_mut(name)
        .ok_or_else(|| missing_collection(name))
}

fn missing_collection(name: &str) -> Error {
    Error::replay(format!("collection '{}' does not exist", name))
}

fn missing_field(collection: &Collection, field: &str) -> Error {
    Error::replay(format!(
        "field '{}' does not exist in collection '{}'",
        field, collection.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::SchemaDiff;
    use crate::schema::{Field, FieldKind, RuleSlot, Rules};

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new().with_collection(
            Collection::new("posts")
                .with_id("pbc_posts")
                .with_field(Field::new("title", FieldKind::text()).with_id("f_title"))
                .with_rules(Rules::new().with(RuleSlot::List, "")),
        )
    }

    #[test]
    fn test_create_and_delete_collection() {
        let mut schema = schema();
        let tags = Collection::new("tags");

        replay(&mut schema, &MigrationOperation::create_collection(&tags)).unwrap();
        assert!(schema.get("tags").is_some());

        let err = replay(&mut schema, &MigrationOperation::create_collection(&tags)).unwrap_err();
        assert!(matches!(err, Error::Replay(_)));

        replay(&mut schema, &MigrationOperation::delete_collection(&tags)).unwrap();
        assert!(schema.get("tags").is_none());
        assert!(replay(&mut schema, &MigrationOperation::delete_collection(&tags)).is_err());
    }

    #[test]
    fn test_field_update_preserves_id() {
        let mut schema = schema();
        let from = schema.get("posts").unwrap().fields[0].clone();
        let to = Field::new("title", FieldKind::text()).required();
        let op = MigrationOperation::update_field(
            OperationKind::UnsafeFieldUpdate,
            "posts",
            &from,
            &to,
            vec!["now required".into()],
        );

        replay(&mut schema, &op).unwrap();

        let title = schema.get("posts").unwrap().field("title").unwrap();
        assert!(title.required);
        assert_eq!(title.id.as_deref(), Some("f_title"));
    }

    #[test]
    fn test_add_delete_and_rename_field() {
        let mut schema = schema();
        let body = Field::new("body", FieldKind::text());

        replay(&mut schema, &MigrationOperation::add_field("posts", &body)).unwrap();
        assert!(replay(&mut schema, &MigrationOperation::add_field("posts", &body)).is_err());

        replay(&mut schema, &MigrationOperation::rename_field("posts", "body", "content")).unwrap();
        let posts = schema.get("posts").unwrap();
        assert!(posts.field("body").is_none());
        assert!(posts.field("content").is_some());

        let content = Field::new("content", FieldKind::text());
        replay(&mut schema, &MigrationOperation::delete_field("posts", &content)).unwrap();
        assert!(schema.get("posts").unwrap().field("content").is_none());
    }

    #[test]
    fn test_rules_merge_keeps_unset_slots() {
        let mut schema = schema();
        let rules = Rules::new().with(RuleSlot::Create, "@request.auth.id != ''");
        let op = MigrationOperation::update_rules("posts", &rules, &[RuleSlot::Create]);

        replay(&mut schema, &op).unwrap();

        let posts = schema.get("posts").unwrap();
        assert_eq!(posts.rules.get(RuleSlot::List), Some(""));
        assert_eq!(posts.rules.get(RuleSlot::Create), Some("@request.auth.id != ''"));
    }

    #[test]
    fn test_index_operations() {
        let mut schema = schema();
        let index = "CREATE INDEX idx_title ON posts (title)";

        replay(&mut schema, &MigrationOperation::add_index("posts", index)).unwrap();
        assert!(schema.get("posts").unwrap().has_index(index));

        replay(&mut schema, &MigrationOperation::delete_index("posts", index)).unwrap();
        assert!(!schema.get("posts").unwrap().has_index(index));
        assert!(replay(&mut schema, &MigrationOperation::delete_index("posts", index)).is_err());
    }

    #[test]
    fn test_unknown_collection() {
        let mut schema = schema();
        let op = MigrationOperation::add_field("missing", &Field::new("x", FieldKind::Bool));

        let err = replay(&mut schema, &op).unwrap_err();
        assert_eq!(err.to_string(), "replay error: collection 'missing' does not exist");
    }

    #[test]
    fn test_replaying_full_plan_converges() {
        let current = schema();
        let desired = SchemaDefinition::new()
            .with_collection(
                Collection::new("posts")
                    .with_field(Field::new("title", FieldKind::text()))
                    .with_field(Field::new("body", FieldKind::text()))
                    .with_index("CREATE INDEX idx_title ON posts (title)")
                    .with_rules(Rules::new().with(RuleSlot::View, "")),
            )
            .with_collection(Collection::new("tags"));

        let plan = SchemaDiff::compute(&desired, &current).unwrap();
        let mut replayed = current.clone();
        for (_, op) in plan.operations() {
            replay(&mut replayed, op).unwrap();
        }

        assert!(SchemaDiff::compute(&desired, &replayed).unwrap().is_empty());
    }
}
