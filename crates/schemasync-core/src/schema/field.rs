//! Field definitions for collections.
//!
//! Every field shares a common envelope (name, required, unique) and carries a
//! kind-specific option struct. Option structs deserialize from the loosely
//! typed `options` object of the wire format.

use serde::{Deserialize, Deserializer, Serialize};

/// A field definition within a collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    /// Backend-assigned field identity, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Field name, unique within its collection.
    pub name: String,
    /// Whether a value must be present.
    pub required: bool,
    /// Whether values must be unique across records.
    pub unique: bool,
    /// Field type and its options.
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl Field {
    /// Create an optional, non-unique field.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: None,
            name: name.into(),
            required: false,
            unique: false,
            kind,
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the backend identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Wire name of the field type.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Copy of this field without its backend identity.
    pub(crate) fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }
}

/// Field type with typed options.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text.
    Text(TextOptions),
    /// Numeric value.
    Number(NumberOptions),
    /// Boolean flag.
    Bool,
    /// Email address.
    Email(DomainOptions),
    /// URL.
    Url(DomainOptions),
    /// Date/time value.
    Date(DateOptions),
    /// One or more values from a fixed list.
    Select(SelectOptions),
    /// Arbitrary JSON.
    Json(JsonOptions),
    /// Uploaded file(s).
    File(FileOptions),
    /// Reference to records of another collection.
    Relation(RelationOptions),
}

impl FieldKind {
    /// Text field without constraints.
    pub fn text() -> Self {
        FieldKind::Text(TextOptions::default())
    }

    /// Number field without constraints.
    pub fn number() -> Self {
        FieldKind::Number(NumberOptions::default())
    }

    /// Email field without domain restrictions.
    pub fn email() -> Self {
        FieldKind::Email(DomainOptions::default())
    }

    /// Select field over the given values.
    pub fn select<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Select(SelectOptions {
            values: values.into_iter().map(Into::into).collect(),
            max_select: None,
        })
    }

    /// Relation field pointing at the given collection id.
    pub fn relation(collection_id: impl Into<String>) -> Self {
        FieldKind::Relation(RelationOptions {
            collection_id: collection_id.into(),
            ..RelationOptions::default()
        })
    }

    /// Wire name of the type.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text(_) => "text",
            FieldKind::Number(_) => "number",
            FieldKind::Bool => "bool",
            FieldKind::Email(_) => "email",
            FieldKind::Url(_) => "url",
            FieldKind::Date(_) => "date",
            FieldKind::Select(_) => "select",
            FieldKind::Json(_) => "json",
            FieldKind::File(_) => "file",
            FieldKind::Relation(_) => "relation",
        }
    }

    /// Normalize option values that the backend treats as "unset".
    pub(crate) fn normalized(self) -> Self {
        match self {
            FieldKind::Text(opts) => FieldKind::Text(TextOptions {
                min: opts.min.filter(|v| *v > 0),
                max: opts.max.filter(|v| *v > 0),
                pattern: opts.pattern.filter(|p| !p.is_empty()),
            }),
            FieldKind::Date(opts) => FieldKind::Date(DateOptions {
                min: opts.min.filter(|v| !v.is_empty()),
                max: opts.max.filter(|v| !v.is_empty()),
            }),
            other => other,
        }
    }
}

/// Options for text fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOptions {
    /// Minimum length.
    pub min: Option<u64>,
    /// Maximum length.
    pub max: Option<u64>,
    /// Regular expression values must match.
    pub pattern: Option<String>,
}

/// Options for number fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberOptions {
    /// Minimum value.
    pub min: Option<f64>,
    /// Maximum value.
    pub max: Option<f64>,
    /// Whether only integers are accepted.
    pub no_decimal: bool,
}

/// Domain restrictions for email and url fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainOptions {
    /// Domains that are rejected.
    #[serde(deserialize_with = "nullable_vec")]
    pub except_domains: Vec<String>,
    /// Domains that are the only ones accepted.
    #[serde(deserialize_with = "nullable_vec")]
    pub only_domains: Vec<String>,
}

/// Options for date fields. Bounds are kept in their wire representation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateOptions {
    /// Earliest accepted date.
    pub min: Option<String>,
    /// Latest accepted date.
    pub max: Option<String>,
}

/// Options for select fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectOptions {
    /// Accepted values.
    #[serde(deserialize_with = "nullable_vec")]
    pub values: Vec<String>,
    /// Maximum number of selected values.
    pub max_select: Option<u32>,
}

/// Options for json fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonOptions {
    /// Maximum serialized size in bytes.
    pub max_size: Option<u64>,
}

/// Options for file fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileOptions {
    /// Maximum number of files.
    pub max_select: Option<u32>,
    /// Maximum size per file in bytes.
    pub max_size: Option<u64>,
    /// Accepted MIME types.
    #[serde(deserialize_with = "nullable_vec")]
    pub mime_types: Vec<String>,
    /// Thumbnail sizes.
    #[serde(deserialize_with = "nullable_vec")]
    pub thumbs: Vec<String>,
    /// Whether files require a token to download.
    pub protected: bool,
}

/// Options for relation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationOptions {
    /// Identity of the referenced collection.
    pub collection_id: String,
    /// Whether deleting the referenced record deletes this one.
    pub cascade_delete: bool,
    /// Minimum number of references.
    pub min_select: Option<u32>,
    /// Maximum number of references.
    pub max_select: Option<u32>,
}

fn nullable_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
