#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};

use schemars::schema::RootSchema;
use serde_json::Value;

mod content_walker;
mod diff_walker;
mod infer;
mod loader;
#[cfg(feature = "mock-server")]
pub mod mock_server;
mod report;
mod required;
mod resolver;
mod types;

pub use content_walker::values_equal;
pub use infer::{infer_schema, SchemaBuilder, META_SCHEMA};
pub use loader::{load_document, save_document};
pub use report::{FailureReport, Mode, Report, ReportBuilder, Status};
pub use required::{diff_required, RecordSchema};
pub use types::*;

/// File name of the old document's schema artifact.
pub const OLD_SCHEMA_FILE: &str = "schema_old.json";
/// File name of the new document's schema artifact.
pub const NEW_SCHEMA_FILE: &str = "schema_new.json";

/// Take two JSON documents, and compare their content.
///
/// `lhs` (left-hand side) is the old document, `rhs` (right-hand side) is the new one. Object
/// members and array elements are compared regardless of their order.
pub fn diff_content(lhs: &Value, rhs: &Value) -> Vec<Change> {
    let mut walker = content_walker::ContentWalker::new();
    walker.diff("", lhs, rhs);
    walker.changes
}

/// Take two JSON schemas, and compare them.
///
/// `lhs` (left-hand side) is the old schema, `rhs` (right-hand side) is the new schema. Only
/// property and type changes are reported; see [`diff_required`] for required properties.
pub fn diff(lhs: Value, rhs: Value) -> Result<Vec<Change>, Error> {
    let lhs_root: RootSchema = serde_json::from_value(lhs)?;
    let rhs_root: RootSchema = serde_json::from_value(rhs)?;

    Ok(diff_schemas(&lhs_root, &rhs_root))
}

/// Like [`diff`], for schemas that are already parsed.
pub fn diff_schemas(lhs: &RootSchema, rhs: &RootSchema) -> Vec<Change> {
    let mut walker = diff_walker::DiffWalker::new(lhs, rhs);
    walker.diff("", &lhs.schema, &rhs.schema);
    walker.changes
}

/// Run content-comparison mode on two documents on disk.
pub fn compare_content(old: &Path, new: &Path) -> Result<Report, Error> {
    let old_doc = load_document(old)?;
    let new_doc = load_document(new)?;

    Ok(
        ReportBuilder::new(Mode::Content, source_name(old), source_name(new))
            .changes(diff_content(&old_doc, &new_doc))
            .build(),
    )
}

/// Options of schema-comparison mode.
#[derive(Debug, Clone, Default)]
pub struct SchemaOptions {
    /// Directory the inferred schemas are written to, `None` to skip writing them.
    pub schema_dir: Option<PathBuf>,
    /// The sources already are schemas; compare them without inferring.
    pub from_schemas: bool,
}

/// Run schema-comparison mode on two documents on disk.
pub fn compare_schemas(old: &Path, new: &Path, options: &SchemaOptions) -> Result<Report, Error> {
    let old_doc = load_document(old)?;
    let new_doc = load_document(new)?;

    let (old_schema, new_schema) = if options.from_schemas {
        (
            serde_json::from_value::<RootSchema>(old_doc)?,
            serde_json::from_value::<RootSchema>(new_doc)?,
        )
    } else {
        (infer_schema(&old_doc), infer_schema(&new_doc))
    };

    let mut builder = ReportBuilder::new(Mode::Schema, source_name(old), source_name(new));
    match &options.schema_dir {
        Some(dir) if !options.from_schemas => {
            let old_path = dir.join(OLD_SCHEMA_FILE);
            let new_path = dir.join(NEW_SCHEMA_FILE);
            save_document(&old_schema, &old_path)?;
            save_document(&new_schema, &new_path)?;
            builder = builder.schema_paths(source_name(&old_path), source_name(&new_path));
        }
        _ => tracing::debug!("not writing schema artifacts"),
    }

    Ok(builder
        .changes(diff_schemas(&old_schema, &new_schema))
        .changes(diff_required(&old_schema, &new_schema))
        .build())
}

fn source_name(path: &Path) -> String {
    path.display().to_string()
}
