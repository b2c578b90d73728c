// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Persistence of the request inputs inside an artifact directory.
//!
//! Both files are canonical JSON: keys are sorted at every level, output is
//! pretty-printed with two-space indentation and terminated by a newline.
//! Identical inputs therefore produce byte-identical files, which keeps the
//! artifacts diffable under version control.

use std::{fs, path::PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    allocator::ArtifactDirectory,
    error::{self, Error},
    normalizer::NormalizedSpec
};

/// File holding the input records.
pub const DATA_FILE: &str = "data.json";
/// File holding the bound, replayable specification.
pub const SPEC_FILE: &str = "vega_lite_spec.json";

/// Writes `data.json` and `vega_lite_spec.json` into `directory`.
///
/// Each document is serialized fully in memory before a single write, so a
/// failed serialization never leaves a truncated file behind.
///
/// # Returns
///
/// The written paths in order: data file, then specification file.
///
/// # Errors
///
/// Returns [`Error::Serialize`] when a document cannot be encoded and
/// [`Error::Io`] when a file cannot be written.
pub fn write_inputs(
    directory: &ArtifactDirectory,
    normalized: &NormalizedSpec
) -> Result<Vec<PathBuf>, Error> {
    let data = Value::Array(normalized.records.iter().cloned().map(Value::Object).collect());
    let data_path = write_canonical(directory, DATA_FILE, &data)?;
    let spec_path = write_canonical(directory, SPEC_FILE, &normalized.document_value())?;

    Ok(vec![data_path, spec_path])
}

/// Serializes `value` with sorted keys, pretty printing and a trailing
/// newline.
///
/// # Errors
///
/// Returns [`Error::Serialize`] when encoding fails.
pub fn canonical_json(value: &Value) -> Result<Vec<u8>, Error> {
    let mut bytes = serde_json::to_vec_pretty(&canonicalize(value))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_canonical(
    directory: &ArtifactDirectory,
    file_name: &str,
    value: &Value
) -> Result<PathBuf, Error> {
    let bytes = canonical_json(value)?;
    let path = directory.join(file_name);
    fs::write(&path, &bytes).map_err(|source| error::io_error(&path, source))?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

// Rebuilding maps from sorted entries keeps the order stable even when
// serde_json is compiled with `preserve_order`.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|left, right| left.0.cmp(right.0));

            let mut sorted = Map::with_capacity(entries.len());
            for (key, child) in entries {
                sorted.insert(key.clone(), canonicalize(child));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone()
    }
}
