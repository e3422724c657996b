use std::collections::BTreeSet;

use schemars::schema::{RootSchema, SchemaObject, SingleOrVec};

use crate::diff_walker::JsonSchemaExt;
use crate::resolver::Resolver;
use crate::{Change, ChangeKind, JsonSchemaType};

/// The schema describing one record of a response, and where it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// `".?"` when the record is the item schema of an array response, `""` for an object
    /// response.
    pub path: &'static str,
    /// Properties every record carries.
    pub required: BTreeSet<String>,
}

impl RecordSchema {
    /// Find the record schema of `root`.
    ///
    /// An array response's records are its `items`; an object response is its own record.
    /// Anything else has no record and thus no required properties.
    pub fn locate(root: &RootSchema) -> Option<Self> {
        let resolver = Resolver::for_schema(root);
        let resolve = |schema: SchemaObject| {
            let resolved = schema
                .reference
                .as_deref()
                .and_then(|reference| resolver.resolve(root, reference));
            resolved.unwrap_or(schema)
        };

        let schema = resolve(root.schema.clone());
        let types = schema.effective_type().into_set();

        if types.admits(JsonSchemaType::Array) {
            if let Some(SingleOrVec::Single(items)) =
                schema.array.as_deref().and_then(|a| a.items.as_ref())
            {
                let items = resolve(items.clone().into_object());
                return Some(Self {
                    path: ".?",
                    required: required_of(&items),
                });
            }
        }

        if types.admits(JsonSchemaType::Object) {
            return Some(Self {
                path: "",
                required: required_of(&schema),
            });
        }

        tracing::debug!(%types, "schema has no record shape, assuming no required fields");
        None
    }
}

fn required_of(schema: &SchemaObject) -> BTreeSet<String> {
    schema
        .object
        .as_deref()
        .map(|o| o.required.iter().cloned().collect())
        .unwrap_or_default()
}

/// Compare the required properties of the record schemas of `lhs` and `rhs`.
///
/// Plain set difference both ways: `RequiredRemoved` for properties only `lhs` requires, at the
/// path of the old record, and `RequiredAdded` for properties only `rhs` requires, at the path
/// of the new record.
pub fn diff_required(lhs: &RootSchema, rhs: &RootSchema) -> Vec<Change> {
    let lhs_record = RecordSchema::locate(lhs);
    let rhs_record = RecordSchema::locate(rhs);

    let lhs_path = lhs_record.as_ref().map_or("", |record| record.path);
    let rhs_path = rhs_record.as_ref().map_or("", |record| record.path);
    let lhs_required = lhs_record.map(|r| r.required).unwrap_or_default();
    let rhs_required = rhs_record.map(|r| r.required).unwrap_or_default();

    let removed = lhs_required.difference(&rhs_required).map(|property| Change {
        path: lhs_path.to_owned(),
        change: ChangeKind::RequiredRemoved {
            property: property.clone(),
        },
    });
    let added = rhs_required.difference(&lhs_required).map(|property| Change {
        path: rhs_path.to_owned(),
        change: ChangeKind::RequiredAdded {
            property: property.clone(),
        },
    });

    removed.chain(added).collect()
}
