use std::collections::BTreeMap;

use schemars::schema::{RootSchema, Schema, SchemaObject};

/// Looks up local `$ref`s of a schema that was read from disk.
///
/// Inferred schemas never contain references, but schema files compared with `--from-schemas`
/// may have been written by hand or by other generators.
pub struct Resolver {
    ref_lookup: BTreeMap<String, String>,
    root_refs: Vec<String>,
}

impl Resolver {
    pub fn for_schema(root: &RootSchema) -> Self {
        let mut ref_lookup = BTreeMap::new();
        let mut root_refs = vec!["#".to_owned()];
        let root_id = root.schema.get_schema_id();

        if let Some(root_id) = root_id {
            root_refs.push(root_id.to_owned());
            root_refs.push(format!("{root_id}#"));
        }

        for (key, schema) in &root.definitions {
            if let Some(id) = schema.get_schema_id() {
                ref_lookup.insert(id.to_owned(), key.clone());
            }

            if let Some(root_id) = root_id {
                ref_lookup.insert(format!("{root_id}#/definitions/{key}"), key.clone());
                ref_lookup.insert(format!("{root_id}#/$defs/{key}"), key.clone());
            }

            ref_lookup.insert(format!("#/definitions/{key}"), key.clone());
            ref_lookup.insert(format!("#/$defs/{key}"), key.clone());
        }

        Self {
            ref_lookup,
            root_refs,
        }
    }

    /// Resolves a reference.
    ///
    /// `root` must be the same schema that was used to construct the resolver.
    /// This is not checked.
    pub fn resolve(&self, root: &RootSchema, reference: &str) -> Option<SchemaObject> {
        if self.root_refs.iter().any(|r| r == reference) {
            return Some(root.schema.clone());
        }
        let key = self.ref_lookup.get(reference)?;
        root.definitions
            .get(key)
            .map(|schema| schema.clone().into_object())
    }
}

trait MayHaveSchemaId {
    fn get_schema_id(&self) -> Option<&str>;
}

impl MayHaveSchemaId for SchemaObject {
    fn get_schema_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.id.as_ref())
            .map(|id| id.as_str())
    }
}

impl MayHaveSchemaId for Schema {
    fn get_schema_id(&self) -> Option<&str> {
        match self {
            Schema::Object(schema_obj) => schema_obj.get_schema_id(),
            Schema::Bool(_) => None,
        }
    }
}
