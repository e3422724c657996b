use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use schemars::schema::InstanceType;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// An "atomic" difference found going from the old document (LHS) to the new one (RHS).
///
/// Just a wrapper container for `ChangeKind`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// Path of the object, array or schema the change was found in. `""` for the root, `".foo"`
    /// for member foo, `"[2]"` for an array element and `".?"` for the items of an array schema.
    pub path: String,
    /// Data specific to the kind of change.
    #[serde(flatten)]
    pub change: ChangeKind,
}

/// The kind of change + data relevant to the change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeKind {
    /// A leaf present in both documents holds a different value, or a value of a different type.
    ValueChanged {
        /// The value in the old document.
        old_value: Value,
        /// The value in the new document.
        new_value: Value,
    },
    /// An object member present in the old document is missing from the new one.
    KeyRemoved {
        /// The name of the removed member.
        removed: String,
        /// Its value in the old document.
        value: Value,
    },
    /// An object member appeared in the new document.
    KeyAdded {
        /// The name of the added member.
        added: String,
        /// Its value in the new document.
        value: Value,
    },
    /// An array element of the old document has no counterpart in the new one.
    ItemRemoved {
        /// The element that went away.
        value: Value,
    },
    /// An array element of the new document has no counterpart in the old one.
    ItemAdded {
        /// The element that appeared.
        value: Value,
    },
    /// A property has been added to an object schema.
    PropertyAdded {
        /// The name of the added property.
        added: String,
    },
    /// A property has been removed from an object schema.
    PropertyRemoved {
        /// The name of the removed property.
        removed: String,
    },
    /// The set of types a schema admits has changed.
    TypeChanged {
        /// Types admitted by the old schema.
        old_type: TypeSet,
        /// Types admitted by the new schema.
        new_type: TypeSet,
    },
    /// A previously required property is no longer required.
    RequiredRemoved {
        /// The property that is no longer required
        property: String,
    },
    /// A previously optional (or unknown) property is now required.
    RequiredAdded {
        /// The property that is now required
        property: String,
    },
}

impl ChangeKind {
    /// Whether the change can break a consumer of the API response.
    ///
    /// Changes are exposed as-is, so callers can apply their own policy. The rule used here is
    /// that a change is breaking when something a consumer could rely on in the old response is
    /// gone or different in the new one. Pure additions are not breaking.
    pub fn is_breaking(&self) -> bool {
        match self {
            Self::ValueChanged { .. } => true,
            Self::KeyRemoved { .. } => true,
            Self::KeyAdded { .. } => false,
            Self::ItemRemoved { .. } => true,
            Self::ItemAdded { .. } => false,
            Self::PropertyAdded { .. } => false,
            Self::PropertyRemoved { .. } => true,
            Self::TypeChanged { .. } => true,
            Self::RequiredRemoved { .. } => true,
            Self::RequiredAdded { .. } => false,
        }
    }

    /// The report category this change is filed under.
    pub fn category(&self) -> Category {
        match self {
            Self::ValueChanged { .. } => Category::AddedValues,
            Self::KeyRemoved { .. } => Category::RemovedValues,
            Self::KeyAdded { .. } => Category::AddedKeys,
            Self::ItemRemoved { .. } => Category::RemovedItems,
            Self::ItemAdded { .. } => Category::AddedItems,
            Self::PropertyAdded { .. } => Category::AddedKeys,
            Self::PropertyRemoved { .. } => Category::RemovedKeys,
            Self::TypeChanged { .. } => Category::ModifiedTypes,
            Self::RequiredRemoved { .. } => Category::RemovedRequired,
            Self::RequiredAdded { .. } => Category::AddedRequired,
        }
    }
}

/// Report buckets. The names are what CI tooling reads from the `differences` object.
///
/// `AddedValues` holds value changes; the name is kept for compatibility with existing
/// pipelines.
#[derive(Serialize, Clone, Copy, Ord, Eq, PartialEq, PartialOrd, Hash, Debug)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Category {
    AddedValues,
    RemovedValues,
    AddedKeys,
    RemovedKeys,
    RemovedItems,
    AddedItems,
    ModifiedTypes,
    RemovedRequired,
    AddedRequired,
}

impl Category {
    /// Categories reported in content-comparison mode.
    pub const CONTENT: &'static [Category] = &[
        Category::AddedValues,
        Category::RemovedValues,
        Category::AddedKeys,
        Category::RemovedItems,
        Category::AddedItems,
    ];

    /// Categories reported in schema-comparison mode.
    pub const SCHEMA: &'static [Category] = &[
        Category::AddedKeys,
        Category::RemovedKeys,
        Category::ModifiedTypes,
        Category::RemovedRequired,
        Category::AddedRequired,
    ];

    /// The name used as key in the report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AddedValues => "added_values",
            Category::RemovedValues => "removed_values",
            Category::AddedKeys => "added_keys",
            Category::RemovedKeys => "removed_keys",
            Category::RemovedItems => "removed_items",
            Category::AddedItems => "added_items",
            Category::ModifiedTypes => "modified_types",
            Category::RemovedRequired => "removed_required",
            Category::AddedRequired => "added_required",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The errors that can happen in this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A source document could not be read.
    #[error("error loading {}: {source}", .path.display())]
    Load {
        /// The source that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// A source document is not valid JSON.
    #[error("error loading {}: {source}", .path.display())]
    Parse {
        /// The source that failed.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },
    /// Failed to parse the JSON schema.
    ///
    /// Any deserialization errors from serde that happen while converting the value into our AST
    /// end up here.
    #[error("failed to parse schema")]
    Schema(#[from] serde_json::Error),
    /// A generated schema could not be written out.
    #[error("failed to write schema to {}: {source}", .path.display())]
    Persist {
        /// The artifact path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// All primitive types defined in JSON schema.
#[derive(Serialize, Clone, Copy, Ord, Eq, PartialEq, PartialOrd, Debug, Hash)]
#[allow(missing_docs)]
pub enum JsonSchemaType {
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "string")]
    String,
    #[serde(rename = "array")]
    Array,
    #[serde(rename = "object")]
    Object,
}

impl JsonSchemaType {
    /// The type tag of a concrete JSON value. Numbers without a fractional part are `integer`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonSchemaType::Null,
            Value::Bool(_) => JsonSchemaType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonSchemaType::Integer,
            Value::Number(_) => JsonSchemaType::Number,
            Value::String(_) => JsonSchemaType::String,
            Value::Array(_) => JsonSchemaType::Array,
            Value::Object(_) => JsonSchemaType::Object,
        }
    }

    /// The name used in JSON schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonSchemaType::Null => "null",
            JsonSchemaType::Boolean => "boolean",
            JsonSchemaType::Integer => "integer",
            JsonSchemaType::Number => "number",
            JsonSchemaType::String => "string",
            JsonSchemaType::Array => "array",
            JsonSchemaType::Object => "object",
        }
    }
}

impl From<JsonSchemaType> for InstanceType {
    fn from(t: JsonSchemaType) -> Self {
        match t {
            JsonSchemaType::String => InstanceType::String,
            JsonSchemaType::Number => InstanceType::Number,
            JsonSchemaType::Integer => InstanceType::Integer,
            JsonSchemaType::Object => InstanceType::Object,
            JsonSchemaType::Array => InstanceType::Array,
            JsonSchemaType::Boolean => InstanceType::Boolean,
            JsonSchemaType::Null => InstanceType::Null,
        }
    }
}

impl From<InstanceType> for JsonSchemaType {
    fn from(t: InstanceType) -> Self {
        match t {
            InstanceType::String => JsonSchemaType::String,
            InstanceType::Number => JsonSchemaType::Number,
            InstanceType::Integer => JsonSchemaType::Integer,
            InstanceType::Object => JsonSchemaType::Object,
            InstanceType::Array => JsonSchemaType::Array,
            InstanceType::Boolean => JsonSchemaType::Boolean,
            InstanceType::Null => JsonSchemaType::Null,
        }
    }
}

/// The types a schema admits.
///
/// Serializes as a single type name when there is exactly one type, and as a sorted array
/// otherwise, the same way the `type` keyword is written in a schema.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct TypeSet(pub BTreeSet<JsonSchemaType>);

impl TypeSet {
    /// Whether `ty` is admitted.
    pub fn admits(&self, ty: JsonSchemaType) -> bool {
        self.0.contains(&ty)
    }
}

impl FromIterator<JsonSchemaType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = JsonSchemaType>>(iter: I) -> Self {
        TypeSet(iter.into_iter().collect())
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.len() {
            1 => self.0.iter().next().serialize(serializer),
            _ => serializer.collect_seq(self.0.iter()),
        }
    }
}

impl fmt::Display for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.0.iter().map(JsonSchemaType::as_str).collect();
        f.write_str(&names.join("|"))
    }
}
