use std::collections::BTreeSet;

use schemars::schema::{RootSchema, Schema, SchemaObject, SingleOrVec};

use crate::resolver::Resolver;
use crate::{Change, ChangeKind, JsonSchemaType, TypeSet};

/// Walks two schemas side by side and records property and type changes.
pub struct DiffWalker<'a> {
    pub changes: Vec<Change>,
    lhs_root: &'a RootSchema,
    rhs_root: &'a RootSchema,
    lhs_resolver: Resolver,
    rhs_resolver: Resolver,
    /// References currently being followed, to stop on recursive schemas.
    ref_stack: Vec<(Option<String>, Option<String>)>,
}

impl<'a> DiffWalker<'a> {
    pub fn new(lhs_root: &'a RootSchema, rhs_root: &'a RootSchema) -> Self {
        Self {
            changes: vec![],
            lhs_root,
            rhs_root,
            lhs_resolver: Resolver::for_schema(lhs_root),
            rhs_resolver: Resolver::for_schema(rhs_root),
            ref_stack: vec![],
        }
    }

    fn diff_instance_types(&mut self, json_path: &str, lhs: &SchemaObject, rhs: &SchemaObject) {
        let lhs_ty = lhs.effective_type().into_set();
        let rhs_ty = rhs.effective_type().into_set();

        if lhs_ty != rhs_ty {
            self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::TypeChanged {
                    old_type: lhs_ty,
                    new_type: rhs_ty,
                },
            });
        }
    }

    fn diff_properties(&mut self, json_path: &str, lhs: &SchemaObject, rhs: &SchemaObject) {
        let empty = schemars::Map::new();
        let lhs_props = lhs.object.as_deref().map_or(&empty, |o| &o.properties);
        let rhs_props = rhs.object.as_deref().map_or(&empty, |o| &o.properties);

        self.diff_property_names(json_path, lhs_props.keys(), rhs_props.keys());

        for (common, lhs_child) in lhs_props {
            if let Some(rhs_child) = rhs_props.get(common) {
                let new_path = format!("{json_path}.{common}");
                self.diff_schemas(&new_path, lhs_child, rhs_child);
            }
        }
    }

    fn diff_property_names<'k>(
        &mut self,
        json_path: &str,
        lhs_keys: impl Iterator<Item = &'k String>,
        rhs_keys: impl Iterator<Item = &'k String>,
    ) {
        let lhs_props: BTreeSet<_> = lhs_keys.collect();
        let rhs_props: BTreeSet<_> = rhs_keys.collect();

        for removed in lhs_props.difference(&rhs_props) {
            self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::PropertyRemoved {
                    removed: (*removed).clone(),
                },
            });
        }

        for added in rhs_props.difference(&lhs_props) {
            self.changes.push(Change {
                path: json_path.to_owned(),
                change: ChangeKind::PropertyAdded {
                    added: (*added).clone(),
                },
            });
        }
    }

    fn diff_array_items(&mut self, json_path: &str, lhs: &SchemaObject, rhs: &SchemaObject) {
        let lhs_items = lhs.array.as_deref().and_then(|a| a.items.as_ref());
        let rhs_items = rhs.array.as_deref().and_then(|a| a.items.as_ref());

        match (lhs_items, rhs_items) {
            (Some(SingleOrVec::Single(lhs_inner)), Some(SingleOrVec::Single(rhs_inner))) => {
                let new_path = format!("{json_path}.?");
                self.diff_schemas(&new_path, lhs_inner, rhs_inner);
            }
            (Some(SingleOrVec::Vec(lhs_items)), Some(SingleOrVec::Vec(rhs_items))) => {
                for (i, (lhs_inner, rhs_inner)) in
                    lhs_items.iter().zip(rhs_items.iter()).enumerate()
                {
                    let new_path = format!("{json_path}.{i}");
                    self.diff_schemas(&new_path, lhs_inner, rhs_inner);
                }
            }
            (Some(SingleOrVec::Single(lhs_inner)), Some(SingleOrVec::Vec(rhs_items))) => {
                for (i, rhs_inner) in rhs_items.iter().enumerate() {
                    let new_path = format!("{json_path}.{i}");
                    self.diff_schemas(&new_path, lhs_inner, rhs_inner);
                }
            }
            (Some(SingleOrVec::Vec(lhs_items)), Some(SingleOrVec::Single(rhs_inner))) => {
                for (i, lhs_inner) in lhs_items.iter().enumerate() {
                    let new_path = format!("{json_path}.{i}");
                    self.diff_schemas(&new_path, lhs_inner, rhs_inner);
                }
            }
            // an array that was (or became) empty has no items to compare
            _ => (),
        }
    }

    fn diff_schemas(&mut self, json_path: &str, lhs: &Schema, rhs: &Schema) {
        self.diff(json_path, &lhs.clone().into_object(), &rhs.clone().into_object());
    }

    fn resolve_references(
        &self,
        lhs: &SchemaObject,
        rhs: &SchemaObject,
    ) -> (SchemaObject, SchemaObject) {
        let resolve = |resolver: &Resolver, root: &RootSchema, schema: &SchemaObject| {
            schema
                .reference
                .as_deref()
                .and_then(|reference| resolver.resolve(root, reference))
                .unwrap_or_else(|| schema.clone())
        };
        (
            resolve(&self.lhs_resolver, self.lhs_root, lhs),
            resolve(&self.rhs_resolver, self.rhs_root, rhs),
        )
    }

    pub fn diff(&mut self, json_path: &str, lhs: &SchemaObject, rhs: &SchemaObject) {
        let refs = (lhs.reference.clone(), rhs.reference.clone());
        let follows_ref = refs.0.is_some() || refs.1.is_some();
        if follows_ref {
            if self.ref_stack.contains(&refs) {
                return;
            }
            self.ref_stack.push(refs);
        }

        let (lhs, rhs) = self.resolve_references(lhs, rhs);
        self.diff_instance_types(json_path, &lhs, &rhs);

        let lhs_ty = lhs.effective_type().into_set();
        let rhs_ty = rhs.effective_type().into_set();
        let both_admit = |ty| lhs_ty.admits(ty) && rhs_ty.admits(ty);

        if both_admit(JsonSchemaType::Object) {
            self.diff_properties(json_path, &lhs, &rhs);
        }
        if both_admit(JsonSchemaType::Array) {
            self.diff_array_items(json_path, &lhs, &rhs);
        }

        if follows_ref {
            self.ref_stack.pop();
        }
    }
}

fn is_true(schema: &Schema) -> bool {
    match schema {
        Schema::Bool(b) => *b,
        Schema::Object(o) => *o == SchemaObject::default(),
    }
}

pub(crate) trait JsonSchemaExt {
    fn effective_type(&self) -> InternalJsonSchemaType;
}

impl JsonSchemaExt for SchemaObject {
    fn effective_type(&self) -> InternalJsonSchemaType {
        if let Some(ref ty) = self.instance_type {
            match ty {
                SingleOrVec::Single(ty) => JsonSchemaType::from(**ty).into(),
                SingleOrVec::Vec(tys) => InternalJsonSchemaType::Multiple(
                    tys.iter().copied().map(JsonSchemaType::from).collect(),
                ),
            }
        } else if let Some(ref constant) = self.const_value {
            JsonSchemaType::of(constant).into()
        } else if self
            .object
            .as_deref()
            .map_or(false, |o| !o.properties.is_empty())
        {
            JsonSchemaType::Object.into()
        } else if let Some(any_of) = self.subschemas.as_deref().and_then(|s| s.any_of.as_ref()) {
            InternalJsonSchemaType::Multiple(
                any_of
                    .iter()
                    .flat_map(|a| a.clone().into_object().effective_type().into_set().0)
                    .collect(),
            )
        } else if self
            .subschemas
            .as_deref()
            .and_then(|s| s.not.as_deref())
            .map_or(false, is_true)
        {
            InternalJsonSchemaType::Never
        } else {
            InternalJsonSchemaType::Any
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub(crate) enum InternalJsonSchemaType {
    Simple(JsonSchemaType),
    Any,
    Never,
    Multiple(BTreeSet<JsonSchemaType>),
}

impl From<JsonSchemaType> for InternalJsonSchemaType {
    fn from(other: JsonSchemaType) -> Self {
        InternalJsonSchemaType::Simple(other)
    }
}

impl InternalJsonSchemaType {
    pub(crate) fn into_set(self) -> TypeSet {
        match self {
            Self::Simple(x) => [x].into_iter().collect(),
            Self::Multiple(xs) => TypeSet(xs),
            Self::Any => [
                JsonSchemaType::Null,
                JsonSchemaType::Boolean,
                JsonSchemaType::Integer,
                JsonSchemaType::Number,
                JsonSchemaType::String,
                JsonSchemaType::Array,
                JsonSchemaType::Object,
            ]
            .into_iter()
            .collect(),
            Self::Never => TypeSet::default(),
        }
    }
}
