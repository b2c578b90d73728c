// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Success and failure contract returned to `create_chart` callers.
//!
//! Render failures never turn a call into a failure: the data and
//! specification files are already on disk and useful on their own, so they
//! are reported as warnings next to the files that were written.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{allocator::ArtifactDirectory, error::Error, render::RenderOutcome};

/// Overall state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Artifacts were persisted, possibly with warnings.
    Success,
    /// The call stopped before producing a usable artifact set.
    Failure
}

/// Kind tag and message describing an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Stable kind tag, see [`Error::kind`].
    pub kind:    String,
    /// Human readable description.
    pub message: String
}

impl From<&Error> for ErrorReport {
    fn from(error: &Error) -> Self {
        Self {
            kind:    error.kind().to_owned(),
            message: error.to_string()
        }
    }
}

/// Outcome of one `create_chart` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    /// Whether the call succeeded.
    pub status:    Status,
    /// Artifact directory, present on success.
    pub directory: Option<PathBuf>,
    /// Every written file in order, present on success.
    pub files:     Vec<PathBuf>,
    /// Non-fatal render failures.
    pub warnings:  Vec<ErrorReport>,
    /// Fatal error, present on failure.
    pub error:     Option<ErrorReport>
}

impl OperationResult {
    /// Builds a failed result from `error`.
    pub fn failure(error: &Error) -> Self {
        Self {
            status:    Status::Failure,
            directory: None,
            files:     Vec::new(),
            warnings:  Vec::new(),
            error:     Some(ErrorReport::from(error))
        }
    }

    /// Returns `true` when artifacts were persisted.
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Encodes the result in the tool output shape.
    ///
    /// Success yields `{directory, files}` plus `warnings` when any render
    /// failed; failure yields `{error: {kind, message}}`.
    pub fn to_payload(&self) -> Value {
        match (&self.status, &self.error) {
            (Status::Failure, Some(error)) => json!({ "error": error }),
            (Status::Failure, None) => json!({
                "error": { "kind": "internal", "message": "operation failed without diagnostics" }
            }),
            (Status::Success, _) => {
                let mut payload = Map::new();
                payload.insert(
                    "directory".to_owned(),
                    self.directory.as_deref().map_or(Value::Null, path_value)
                );
                payload.insert(
                    "files".to_owned(),
                    self.files.iter().map(|path| path_value(path)).collect()
                );
                if !self.warnings.is_empty() {
                    payload.insert("warnings".to_owned(), json!(self.warnings));
                }
                Value::Object(payload)
            }
        }
    }
}

// Paths outside UTF-8 are reported lossily; the files on disk keep their
// exact names.
fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// Assembles the result for a call whose inputs were persisted.
///
/// Rendered images are appended to `written` in outcome order. Render errors
/// become warnings.
///
/// # Errors
///
/// Propagates the first non-render error among `outcomes`, such as a failed
/// image write, which aborts the call.
pub fn build(
    directory: &ArtifactDirectory,
    written: Vec<PathBuf>,
    outcomes: Vec<RenderOutcome>
) -> Result<OperationResult, Error> {
    let mut files = written;
    let mut warnings = Vec::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(artifact) => files.push(artifact.path),
            Err(error @ Error::Render {
                ..
            }) => warnings.push(ErrorReport::from(&error)),
            Err(error) => return Err(error)
        }
    }

    Ok(OperationResult {
        status: Status::Success,
        directory: Some(directory.path.clone()),
        files,
        warnings,
        error: None
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::{format::OutputFormat, render::RenderedArtifact};

    fn directory() -> ArtifactDirectory {
        ArtifactDirectory {
            path: PathBuf::from("/charts/sales"),
            slug: "sales".to_owned()
        }
    }

    fn inputs() -> Vec<PathBuf> {
        vec![
            PathBuf::from("/charts/sales/data.json"),
            PathBuf::from("/charts/sales/vega_lite_spec.json"),
        ]
    }

    fn rendered(format: OutputFormat) -> RenderOutcome {
        RenderOutcome {
            format,
            result: Ok(RenderedArtifact {
                format,
                bytes: b"image".to_vec(),
                path: PathBuf::from(format!("/charts/sales/{}", format.file_name()))
            })
        }
    }

    #[test]
    fn build_lists_every_file_on_success() {
        let result = build(&directory(), inputs(), vec![rendered(OutputFormat::Svg)]).unwrap();

        assert!(result.is_success());
        assert_eq!(result.directory, Some(PathBuf::from("/charts/sales")));
        assert_eq!(result.files.len(), 3);
        assert_eq!(result.files[2], PathBuf::from("/charts/sales/graph.svg"));
        assert_eq!(
            result.to_payload(),
            json!({
                "directory": "/charts/sales",
                "files": [
                    "/charts/sales/data.json",
                    "/charts/sales/vega_lite_spec.json",
                    "/charts/sales/graph.svg"
                ]
            })
        );
    }

    #[test]
    fn build_turns_render_errors_into_warnings() {
        let failed = RenderOutcome {
            format: OutputFormat::Png,
            result: Err(Error::render(OutputFormat::Png, "unknown field"))
        };

        let result = build(&directory(), inputs(), vec![failed, rendered(OutputFormat::Pdf)]).unwrap();

        assert!(result.is_success());
        assert_eq!(result.files.len(), 3);
        assert_eq!(result.warnings, [ErrorReport {
            kind:    "render".to_owned(),
            message: "failed to render png chart: unknown field".to_owned()
        }]);
        assert_eq!(result.to_payload()["warnings"][0]["kind"], "render");
    }

    #[test]
    fn build_propagates_io_errors() {
        let failed = RenderOutcome {
            format: OutputFormat::Svg,
            result: Err(crate::error::io_error(
                std::path::Path::new("/charts/sales/graph.svg"),
                std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full")
            ))
        };

        let error = build(&directory(), inputs(), vec![failed]).unwrap_err();
        assert_eq!(error.kind(), "io");
    }

    #[cfg(unix)]
    #[test]
    fn payload_reports_non_utf8_paths_lossily() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let path = PathBuf::from(OsStr::from_bytes(b"/charts/sales\xff"));
        let directory = ArtifactDirectory {
            path: path.clone(),
            slug: "sales".to_owned()
        };

        let result = build(&directory, vec![path.join("data.json")], Vec::new()).unwrap();
        let payload = result.to_payload();

        assert_eq!(payload["directory"], "/charts/sales\u{FFFD}");
        assert_eq!(payload["files"][0], "/charts/sales\u{FFFD}/data.json");
    }

    #[test]
    fn failure_payload_carries_kind_and_message() {
        let result = OperationResult::failure(&Error::validation("title must not be empty"));

        assert!(!result.is_success());
        assert!(result.files.is_empty());
        assert_eq!(
            result.to_payload(),
            json!({
                "error": {
                    "kind": "validation",
                    "message": "invalid request: title must not be empty"
                }
            })
        );
    }
}
