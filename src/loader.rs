use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::report::write_json;
use crate::Error;

/// Read a JSON document from `path`.
///
/// A missing or unreadable file is reported as [`Error::Load`], malformed content as
/// [`Error::Parse`]. Both are distinct from anything the comparison itself reports.
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, Error> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Load {
        path: path.to_owned(),
        source,
    })?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_owned(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(value)
}

/// Write `value` as JSON indented by four spaces to `path`, creating the parent directory if
/// needed. Nothing is written when `value` cannot be serialized.
pub fn save_document<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), Error> {
    let path = path.as_ref();
    let persist_err = |source| Error::Persist {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist_err)?;
    }
    let mut contents = vec![];
    write_json(&mut contents, value, false).map_err(persist_err)?;
    fs::write(path, contents).map_err(persist_err)?;
    tracing::info!(path = %path.display(), "schema saved");
    Ok(())
}
