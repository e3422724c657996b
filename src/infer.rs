use std::collections::{BTreeMap, BTreeSet};

use schemars::schema::{
    ArrayValidation, InstanceType, ObjectValidation, RootSchema, Schema, SchemaObject,
    SingleOrVec,
};
use serde_json::Value;

use crate::JsonSchemaType;

/// Meta-schema written into every inferred schema.
pub const META_SCHEMA: &str = "http://json-schema.org/schema#";

/// Accumulates samples and produces a schema that describes all of them.
///
/// Adding samples is commutative: the resulting schema does not depend on the order in which
/// samples, array elements or object members were seen.
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    root: Node,
}

impl SchemaBuilder {
    /// A builder that has seen no samples yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one more sample into the schema.
    pub fn add_sample(&mut self, value: &Value) -> &mut Self {
        self.root.add_value(value);
        self
    }

    /// The schema of everything added so far.
    pub fn to_schema(&self) -> RootSchema {
        RootSchema {
            meta_schema: Some(META_SCHEMA.to_owned()),
            schema: self.root.to_schema(),
            definitions: Default::default(),
        }
    }
}

/// What has been observed at one path.
#[derive(Debug, Clone, Default)]
struct Node {
    types: BTreeSet<JsonSchemaType>,
    properties: BTreeMap<String, Node>,
    /// Members present in every object sample. `None` until an object has been seen.
    required: Option<BTreeSet<String>>,
    items: Option<Box<Node>>,
}

impl Node {
    fn add_value(&mut self, value: &Value) {
        self.types.insert(JsonSchemaType::of(value));
        match value {
            Value::Object(members) => {
                let keys: BTreeSet<String> = members.keys().cloned().collect();
                self.required = Some(match self.required.take() {
                    Some(required) => required.intersection(&keys).cloned().collect(),
                    None => keys,
                });
                for (key, member) in members {
                    self.properties
                        .entry(key.clone())
                        .or_default()
                        .add_value(member);
                }
            }
            Value::Array(elements) => {
                for element in elements {
                    self.items.get_or_insert_with(Default::default).add_value(element);
                }
            }
            _ => (),
        }
    }

    fn to_schema(&self) -> SchemaObject {
        let mut types = self.types.clone();
        if types.contains(&JsonSchemaType::Number) {
            types.remove(&JsonSchemaType::Integer);
        }

        let instance_type = match types.len() {
            0 => None,
            1 => types
                .iter()
                .next()
                .map(|ty| SingleOrVec::Single(Box::new(InstanceType::from(*ty)))),
            _ => Some(SingleOrVec::Vec(
                types.iter().copied().map(InstanceType::from).collect(),
            )),
        };

        let object = types.contains(&JsonSchemaType::Object).then(|| {
            Box::new(ObjectValidation {
                properties: self
                    .properties
                    .iter()
                    .map(|(key, node)| (key.clone(), Schema::Object(node.to_schema())))
                    .collect(),
                required: self.required.iter().flatten().cloned().collect(),
                ..Default::default()
            })
        });

        let array = self.items.as_ref().map(|items| {
            Box::new(ArrayValidation {
                items: Some(SingleOrVec::Single(Box::new(Schema::Object(
                    items.to_schema(),
                )))),
                ..Default::default()
            })
        });

        SchemaObject {
            instance_type,
            object,
            array,
            ..Default::default()
        }
    }
}

/// Infer the schema of a single document.
///
/// An array document describes its elements through `items`; an object document is its own
/// single sample, so all of its members are required.
pub fn infer_schema(value: &Value) -> RootSchema {
    SchemaBuilder::new().add_sample(value).to_schema()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn infer(value: Value) -> Value {
        serde_json::to_value(infer_schema(&value)).unwrap()
    }

    #[test]
    fn single_object() {
        assert_eq!(
            infer(json!({"name": "akita", "weight": 35})),
            json!({
                "$schema": META_SCHEMA,
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "weight": {"type": "integer"}
                },
                "required": ["name", "weight"]
            })
        );
    }

    #[test]
    fn array_of_records() {
        assert_eq!(
            infer(json!([{"a": 1}, {"a": 1.5, "b": null}, {"a": 2, "b": "x"}])),
            json!({
                "$schema": META_SCHEMA,
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "a": {"type": "number"},
                        "b": {"type": ["null", "string"]}
                    },
                    "required": ["a"]
                }
            })
        );
    }

    #[test]
    fn empty_array_has_no_items() {
        assert_eq!(
            infer(json!([])),
            json!({"$schema": META_SCHEMA, "type": "array"})
        );
    }

    #[test]
    fn required_only_counts_object_samples() {
        let schema = infer(json!([{"a": 1}, null, {"a": 2}]));
        assert_eq!(schema["items"]["type"], json!(["null", "object"]));
        assert_eq!(schema["items"]["required"], json!(["a"]));
    }

    #[test]
    fn nested_arrays_merge_items() {
        let schema = infer(json!({"tags": [["a"], [1, "b"]]}));
        assert_eq!(
            schema["properties"]["tags"],
            json!({
                "type": "array",
                "items": {"type": "array", "items": {"type": ["integer", "string"]}}
            })
        );
    }

    #[test]
    fn sample_order_does_not_matter() {
        let forward = infer(json!([{"a": 1, "b": {"c": true}}, {"a": "x"}]));
        let backward = infer(json!([{"a": "x"}, {"b": {"c": true}, "a": 1}]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn builder_merges_documents() {
        let mut builder = SchemaBuilder::new();
        builder.add_sample(&json!({"a": 1, "b": 2}));
        builder.add_sample(&json!({"a": 3}));
        let schema = serde_json::to_value(builder.to_schema()).unwrap();
        assert_eq!(schema["required"], json!(["a"]));
        assert_eq!(schema["properties"]["b"], json!({"type": "integer"}));
    }
}
