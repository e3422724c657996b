use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::{Category, Change};

/// Outcome of a run, as read by the CI gate.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No differences.
    Pass,
    /// At least one difference, or the run itself failed.
    Fail,
}

/// Which pipeline produced the differences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Documents compared directly.
    Content,
    /// Inferred schemas compared.
    Schema,
}

impl Mode {
    fn categories(self) -> &'static [Category] {
        match self {
            Mode::Content => Category::CONTENT,
            Mode::Schema => Category::SCHEMA,
        }
    }

    fn message(self, status: Status) -> &'static str {
        match (self, status) {
            (Mode::Content, _) => "API content compared successfully",
            (Mode::Schema, Status::Pass) => "API schemas compared successfully",
            (Mode::Schema, Status::Fail) => "Differences found in schema",
        }
    }
}

/// The single output contract of a comparison run.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Report {
    /// `fail` iff `total_differences > 0`.
    pub status: Status,
    /// Human readable summary.
    pub message: String,
    /// The old document's source.
    pub old_json_path: String,
    /// The new document's source.
    pub new_json_path: String,
    /// Where the old document's inferred schema was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_schema_path: Option<String>,
    /// Where the new document's inferred schema was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_schema_path: Option<String>,
    /// Every category of the mode, each with its (possibly empty) list of changes.
    pub differences: BTreeMap<Category, Vec<Change>>,
    /// Sum of all category sizes.
    pub total_differences: usize,
    /// How many of the differences can break a consumer, see [`crate::ChangeKind::is_breaking`].
    pub breaking_differences: usize,
}

impl Report {
    /// The changes filed under `category`; empty when the mode does not report it.
    pub fn category(&self, category: Category) -> &[Change] {
        self.differences
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Serialize the report, pretty-printed with four-space indentation unless `compact`.
    pub fn write_json<W: Write>(&self, writer: W, compact: bool) -> io::Result<()> {
        write_json(writer, self, compact)
    }
}

/// Collects the changes of one run and assembles the [`Report`].
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    mode: Mode,
    old_source: String,
    new_source: String,
    schema_paths: Option<(String, String)>,
    changes: Vec<Change>,
}

impl ReportBuilder {
    /// Start a report comparing `old_source` to `new_source`.
    pub fn new(mode: Mode, old_source: impl Into<String>, new_source: impl Into<String>) -> Self {
        Self {
            mode,
            old_source: old_source.into(),
            new_source: new_source.into(),
            schema_paths: None,
            changes: vec![],
        }
    }

    /// Record where the inferred schemas were written.
    pub fn schema_paths(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.schema_paths = Some((old.into(), new.into()));
        self
    }

    /// Add discovered changes.
    pub fn changes(mut self, changes: impl IntoIterator<Item = Change>) -> Self {
        self.changes.extend(changes);
        self
    }

    /// File every change under its category and compute the totals and status.
    pub fn build(self) -> Report {
        let mut differences: BTreeMap<Category, Vec<Change>> = self
            .mode
            .categories()
            .iter()
            .map(|category| (*category, vec![]))
            .collect();
        for change in self.changes {
            differences
                .entry(change.change.category())
                .or_default()
                .push(change);
        }

        let total_differences = differences.values().map(Vec::len).sum();
        let breaking_differences = differences
            .values()
            .flatten()
            .filter(|change| change.change.is_breaking())
            .count();
        let status = if total_differences > 0 {
            Status::Fail
        } else {
            Status::Pass
        };
        let (old_schema_path, new_schema_path) = self.schema_paths.unzip();

        Report {
            status,
            message: self.mode.message(status).to_owned(),
            old_json_path: self.old_source,
            new_json_path: self.new_source,
            old_schema_path,
            new_schema_path,
            differences,
            total_differences,
            breaking_differences,
        }
    }
}

/// What is printed instead of a report when a run cannot complete.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    /// Always `fail`.
    pub status: Status,
    /// What went wrong.
    pub message: String,
}

impl FailureReport {
    /// A failure with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
        }
    }

    /// Serialize on a single line, the way it is written to stderr.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"fail","message":"unprintable error"}"#.to_owned())
    }
}

/// Write `value` as JSON followed by a newline, pretty-printed with four-space indentation
/// unless `compact`.
pub(crate) fn write_json<W: Write, T: Serialize>(
    mut writer: W,
    value: &T,
    compact: bool,
) -> io::Result<()> {
    if compact {
        serde_json::to_writer(&mut writer, value)?;
    } else {
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut serializer)?;
    }
    writeln!(writer)
}
