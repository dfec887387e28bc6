//! Schema document codec.
//!
//! Converts between the JSON wire format shared by schema source files and
//! the backend API, and the typed [`SchemaDefinition`] model.

use crate::error::Error;
use crate::schema::{
    Collection, CollectionKind, DateOptions, DomainOptions, Field, FieldKind, FileOptions,
    JsonOptions, NumberOptions, RelationOptions, Rules, SchemaDefinition, SelectOptions,
    TextOptions,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A collection as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCollection {
    /// Backend identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Collection name.
    pub name: String,
    /// Collection kind (`base` or `auth`).
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    /// Field definitions.
    #[serde(default, alias = "fields")]
    pub schema: Vec<RawField>,
    /// Index definitions.
    #[serde(default)]
    pub indexes: Option<Vec<String>>,
    /// List rule.
    #[serde(default)]
    pub list_rule: Option<String>,
    /// View rule.
    #[serde(default)]
    pub view_rule: Option<String>,
    /// Create rule.
    #[serde(default)]
    pub create_rule: Option<String>,
    /// Update rule.
    #[serde(default)]
    pub update_rule: Option<String>,
    /// Delete rule.
    #[serde(default)]
    pub delete_rule: Option<String>,
}

/// A field as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    /// Backend identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Field name.
    pub name: String,
    /// Field type name.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether the field is required.
    #[serde(default)]
    pub required: bool,
    /// Whether the field is unique.
    #[serde(default)]
    pub unique: bool,
    /// Type-specific options.
    #[serde(default)]
    pub options: Value,
}

fn default_kind() -> String {
    CollectionKind::Base.as_str().to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Wrapped { collections: Vec<RawCollection> },
    Bare(Vec<RawCollection>),
}

/// Parse a schema document and validate it.
pub fn parse_document(bytes: &[u8]) -> Result<SchemaDefinition, Error> {
    let document: RawDocument = serde_json::from_slice(bytes)
        .map_err(|e| Error::validation(format!("malformed schema document: {}", e)))?;

    let raw = match document {
        RawDocument::Wrapped { collections } => collections,
        RawDocument::Bare(collections) => collections,
    };

    let definition = from_raw_collections(raw)?;
    definition.normalize()?;
    Ok(definition)
}

/// Convert a list of wire collections into a schema definition.
pub fn from_raw_collections(raw: Vec<RawCollection>) -> Result<SchemaDefinition, Error> {
    let collections = raw
        .into_iter()
        .map(collection_from_raw)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SchemaDefinition { collections })
}

/// Convert collections reported by a backend, skipping the ones the model
/// cannot represent (view collections, unsupported field types).
///
/// Skipped collections are left unmanaged: they never appear in the current
/// schema, so no operation targets them.
pub fn from_backend_collections(raw: Vec<RawCollection>) -> SchemaDefinition {
    let mut collections = Vec::with_capacity(raw.len());
    for item in raw {
        let name = item.name.clone();
        match collection_from_raw(item) {
            Ok(collection) => collections.push(collection),
            Err(e) => tracing::warn!(
                collection = %name,
                error = %e,
                "skipping backend collection the schema model cannot represent"
            ),
        }
    }
    SchemaDefinition { collections }
}

/// Parse a single wire collection.
pub fn parse_collection(bytes: &[u8]) -> Result<Collection, Error> {
    let raw: RawCollection =
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
    collection_from_raw(raw)
}

/// Convert a wire collection into the typed model.
pub fn collection_from_raw(raw: RawCollection) -> Result<Collection, Error> {
    let kind = match raw.kind.as_str() {
        "base" => CollectionKind::Base,
        "auth" => CollectionKind::Auth,
        other => {
            return Err(Error::validation(format!(
                "collection '{}' has unsupported type '{}'",
                raw.name, other
            )))
        }
    };

    let fields = raw
        .schema
        .into_iter()
        .map(|f| field_from_raw(&raw.name, f))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Collection {
        id: raw.id,
        name: raw.name,
        kind,
        fields,
        indexes: raw.indexes.unwrap_or_default(),
        rules: Rules {
            list: raw.list_rule,
            view: raw.view_rule,
            create: raw.create_rule,
            update: raw.update_rule,
            delete: raw.delete_rule,
        },
    })
}

fn field_from_raw(collection: &str, raw: RawField) -> Result<Field, Error> {
    let context = || format!("field '{}' in collection '{}'", raw.name, collection);
    let options = raw.options;

    let kind = match raw.field_type.as_str() {
        "text" => FieldKind::Text(decode_options::<TextOptions>(options, context)?),
        "number" => FieldKind::Number(decode_options::<NumberOptions>(options, context)?),
        "bool" => FieldKind::Bool,
        "email" => FieldKind::Email(decode_options::<DomainOptions>(options, context)?),
        "url" => FieldKind::Url(decode_options::<DomainOptions>(options, context)?),
        "date" => FieldKind::Date(decode_options::<DateOptions>(options, context)?),
        "select" => FieldKind::Select(decode_options::<SelectOptions>(options, context)?),
        "json" => FieldKind::Json(decode_options::<JsonOptions>(options, context)?),
        "file" => FieldKind::File(decode_options::<FileOptions>(options, context)?),
        "relation" => FieldKind::Relation(decode_options::<RelationOptions>(options, context)?),
        other => {
            return Err(Error::validation(format!(
                "{} has unsupported type '{}'",
                context(),
                other
            )))
        }
    };

    Ok(Field {
        id: raw.id,
        name: raw.name,
        required: raw.required,
        unique: raw.unique,
        kind: kind.normalized(),
    })
}

fn decode_options<T>(options: Value, context: impl Fn() -> String) -> Result<T, Error>
where
    T: DeserializeOwned + Default,
{
    if options.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(options)
        .map_err(|e| Error::validation(format!("{} has invalid options: {}", context(), e)))
}

/// Convert a typed collection back to its wire form.
pub fn collection_to_raw(collection: &Collection) -> Result<RawCollection, Error> {
    let schema = collection
        .fields
        .iter()
        .map(field_to_raw)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawCollection {
        id: collection.id.clone(),
        name: collection.name.clone(),
        kind: collection.kind.as_str().to_string(),
        schema,
        indexes: Some(collection.indexes.clone()),
        list_rule: collection.rules.list.clone(),
        view_rule: collection.rules.view.clone(),
        create_rule: collection.rules.create.clone(),
        update_rule: collection.rules.update.clone(),
        delete_rule: collection.rules.delete.clone(),
    })
}

fn field_to_raw(field: &Field) -> Result<RawField, Error> {
    let options = match &field.kind {
        FieldKind::Text(opts) => to_value(opts)?,
        FieldKind::Number(opts) => to_value(opts)?,
        FieldKind::Bool => Value::Object(Default::default()),
        FieldKind::Email(opts) | FieldKind::Url(opts) => to_value(opts)?,
        FieldKind::Date(opts) => to_value(opts)?,
        FieldKind::Select(opts) => to_value(opts)?,
        FieldKind::Json(opts) => to_value(opts)?,
        FieldKind::File(opts) => to_value(opts)?,
        FieldKind::Relation(opts) => to_value(opts)?,
    };

    Ok(RawField {
        id: field.id.clone(),
        name: field.name.clone(),
        field_type: field.type_name().to_string(),
        required: field.required,
        unique: field.unique,
        options,
    })
}

/// Render `collection` onto the wire document it was decoded from.
///
/// Keys the model does not cover are kept from `original`: collection
/// settings, field flags such as `system` or `presentable`, and unknown
/// field options. Fields are matched by id, then by name. Fields missing
/// from `collection` are dropped.
pub fn overlay_collection(original: &Value, collection: &Collection) -> Result<Value, Error> {
    let mut updated = to_value(&collection_to_raw(collection)?)?;
    let Some(base) = original.as_object() else {
        return Ok(updated);
    };

    let fields_key = if base.contains_key("fields") && !base.contains_key("schema") {
        "fields"
    } else {
        "schema"
    };
    let original_fields = base
        .get(fields_key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    if let Some(fields) = updated.get_mut("schema").and_then(Value::as_array_mut) {
        for field in fields.iter_mut() {
            if let Some(previous) = matching_field(original_fields, field) {
                *field = merge(previous, field.take());
            }
        }
    }
    if fields_key == "fields" {
        if let Some(object) = updated.as_object_mut() {
            if let Some(fields) = object.remove("schema") {
                object.insert("fields".to_string(), fields);
            }
        }
    }

    Ok(merge(original, updated))
}

fn matching_field<'a>(original: &'a [Value], field: &Value) -> Option<&'a Value> {
    if let Some(id) = field.get("id").and_then(Value::as_str) {
        if let Some(found) = original.iter().find(|f| f.get("id").and_then(Value::as_str) == Some(id)) {
            return Some(found);
        }
    }
    let name = field.get("name").and_then(Value::as_str)?;
    original
        .iter()
        .find(|f| f.get("name").and_then(Value::as_str) == Some(name))
}

/// Overlay `update` on `base`; nested objects merge key by key, anything
/// else is replaced.
fn merge(base: &Value, update: Value) -> Value {
    match (base, update) {
        (Value::Object(base), Value::Object(update)) => {
            let mut merged = base.clone();
            for (key, value) in update {
                let value = match merged.get(&key) {
                    Some(previous @ Value::Object(_)) if value.is_object() => merge(previous, value),
                    _ => value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (_, update) => update,
    }
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

/// Render a schema definition as a pretty-printed document.
pub fn render_document(definition: &SchemaDefinition) -> Result<Vec<u8>, Error> {
    let collections = definition
        .collections
        .iter()
        .map(collection_to_raw)
        .collect::<Result<Vec<_>, _>>()?;

    serde_json::to_vec_pretty(&serde_json::json!({ "collections": collections }))
        .map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuleSlot;

    const BLOG: &str = r#"{
        "collections": [
            {
                "id": "pbc_users",
                "name": "users",
                "type": "auth",
                "schema": [
                    {"name": "name", "type": "text", "options": {"min": 0, "max": 0, "pattern": ""}},
                    {"name": "email", "type": "email", "unique": true, "options": {"exceptDomains": null}}
                ],
                "indexes": ["CREATE UNIQUE INDEX idx_email ON users (email)"],
                "listRule": "",
                "viewRule": null
            },
            {
                "name": "posts",
                "schema": [
                    {"name": "title", "type": "text", "required": true, "options": {"max": 200}},
                    {"name": "status", "type": "select", "options": {"values": ["draft", "published"], "maxSelect": 1}},
                    {"name": "author", "type": "relation", "options": {"collectionId": "pbc_users", "cascadeDelete": true}}
                ]
            }
        ]
    }"#;

    #[test]
    fn test_parse_document() {
        let schema = parse_document(BLOG.as_bytes()).unwrap();

        assert_eq!(schema.len(), 2);

        let users = schema.get("users").unwrap();
        assert_eq!(users.id.as_deref(), Some("pbc_users"));
        assert_eq!(users.kind, CollectionKind::Auth);
        assert_eq!(users.rules.get(RuleSlot::List), Some(""));
        assert_eq!(users.rules.get(RuleSlot::View), None);
        assert_eq!(users.field("name").unwrap().kind, FieldKind::text());
        assert!(users.field("email").unwrap().unique);

        let posts = schema.get("posts").unwrap();
        assert_eq!(posts.kind, CollectionKind::Base);
        assert!(posts.indexes.is_empty());
        match &posts.field("title").unwrap().kind {
            FieldKind::Text(opts) => assert_eq!(opts.max, Some(200)),
            other => panic!("Expected text field, got {:?}", other),
        }
        match &posts.field("author").unwrap().kind {
            FieldKind::Relation(opts) => {
                assert_eq!(opts.collection_id, "pbc_users");
                assert!(opts.cascade_delete);
            }
            other => panic!("Expected relation field, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_bare_array() {
        let schema = parse_document(br#"[{"name": "tags", "schema": []}]"#).unwrap();
        assert_eq!(schema.collections[0].name, "tags");
    }

    #[test]
    fn test_unknown_field_type_rejected() {
        let doc = r#"[{"name": "posts", "schema": [{"name": "geo", "type": "geopoint"}]}]"#;
        let err = parse_document(doc.as_bytes()).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("field 'geo' in collection 'posts'"));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let doc = r#"[{"name": "posts", "schema": [{"name": "n", "type": "number", "options": {"min": "low"}}]}]"#;
        let err = parse_document(doc.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid options"));
    }

    #[test]
    fn test_missing_name_rejected() {
        let err = parse_document(br#"[{"type": "base"}]"#).unwrap_err();
        assert!(err.to_string().contains("malformed schema document"));
    }

    #[test]
    fn test_duplicate_collections_rejected() {
        let err = parse_document(br#"[{"name": "a"}, {"name": "a"}]"#).unwrap_err();
        assert!(err.to_string().contains("duplicate collection name 'a'"));
    }

    #[test]
    fn test_render_then_parse_preserves_shape() {
        let schema = parse_document(BLOG.as_bytes()).unwrap();
        let rendered = render_document(&schema).unwrap();
        let reparsed = parse_document(&rendered).unwrap();

        assert_eq!(schema, reparsed);
    }

    #[test]
    fn test_backend_collections_skip_unsupported_shapes() {
        let raw: Vec<RawCollection> = serde_json::from_str(
            r#"[
                {"name": "stats", "type": "view", "schema": []},
                {"name": "pages", "schema": [{"name": "body", "type": "editor"}]},
                {"name": "tags", "schema": [{"name": "label", "type": "text"}]}
            ]"#,
        )
        .unwrap();

        let schema = from_backend_collections(raw);

        assert_eq!(schema.len(), 1);
        assert!(schema.get("tags").is_some());
    }

    #[test]
    fn test_overlay_keeps_unmodeled_keys() {
        let original = serde_json::json!({
            "id": "pbc_posts",
            "name": "posts",
            "type": "base",
            "system": false,
            "options": {"query": ""},
            "schema": [
                {
                    "id": "f_author",
                    "name": "author",
                    "type": "relation",
                    "system": false,
                    "presentable": true,
                    "required": false,
                    "unique": false,
                    "options": {"collectionId": "pbc_users", "maxSelect": 1, "displayFields": ["name"]}
                }
            ],
            "indexes": [],
            "listRule": null
        });
        let raw: RawCollection = serde_json::from_value(original.clone()).unwrap();
        let mut collection = collection_from_raw(raw).unwrap();
        collection.rules.list = Some("@request.auth.id != ''".to_string());
        collection.fields.push(Field::new("title", FieldKind::text()));

        let body = overlay_collection(&original, &collection).unwrap();

        assert_eq!(body["system"], false);
        assert_eq!(body["options"]["query"], "");
        assert_eq!(body["listRule"], "@request.auth.id != ''");
        let author = &body["schema"][0];
        assert_eq!(author["presentable"], true);
        assert_eq!(author["system"], false);
        assert_eq!(author["options"]["displayFields"], serde_json::json!(["name"]));
        assert_eq!(author["options"]["collectionId"], "pbc_users");
        assert_eq!(body["schema"][1]["name"], "title");
        assert!(body["schema"][1].get("presentable").is_none());
    }

    #[test]
    fn test_overlay_keeps_fields_key() {
        let original = serde_json::json!({
            "id": "pbc_tags",
            "name": "tags",
            "type": "base",
            "fields": [{"id": "f_label", "name": "label", "type": "text", "hidden": true}]
        });
        let raw: RawCollection = serde_json::from_value(original.clone()).unwrap();
        let collection = collection_from_raw(raw).unwrap();

        let body = overlay_collection(&original, &collection).unwrap();

        assert!(body.get("schema").is_none());
        assert_eq!(body["fields"][0]["hidden"], true);
    }
}
