// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the chart pipeline."]

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Every variant maps onto a stable kind tag through [`Error::kind`]. The tag
//! is what callers of the `create_chart` tool see, so it must not change when
//! messages are reworded.

use std::path::{Path, PathBuf};

use crate::format::OutputFormat;

/// Unified error type returned by the pipeline, configuration loader and CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// The request or a configuration value violates an invariant.
    #[error("invalid request: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps I/O errors raised while creating directories or writing files.
    #[error("filesystem operation failed at {path:?}: {source}")]
    Io {
        /// Location that triggered the failure.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// The rendering engine rejected the document for one output format.
    #[error("failed to render {format} chart: {message}")]
    Render {
        /// Format whose export failed.
        format:  OutputFormat,
        /// Diagnostic reported by the engine.
        message: String
    },
    /// Wraps YAML decoding errors from the configuration file.
    #[error("failed to parse configuration: {source}")]
    Config {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Wraps JSON encoding and decoding errors.
    #[error("failed to serialize document: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// The request exceeded the transport deadline and was abandoned.
    #[error("request did not complete within {seconds}s")]
    Timeout {
        /// Deadline that elapsed, in seconds.
        seconds: u64
    },
    /// A worker stopped unexpectedly, for example by panicking.
    #[error("internal error: {message}")]
    Internal {
        /// Human readable description of the failure.
        message: String
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a render error for `format`.
    ///
    /// # Parameters
    ///
    /// * `format` - Output format the engine failed to produce.
    /// * `message` - Diagnostic reported by the engine.
    pub fn render<M>(format: OutputFormat, message: M) -> Self
    where
        M: Into<String>
    {
        Self::Render {
            format,
            message: message.into()
        }
    }

    /// Returns the stable kind tag reported to tool callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation {
                ..
            } => "validation",
            Self::Io {
                ..
            } => "io",
            Self::Render {
                ..
            } => "render",
            Self::Config {
                ..
            } => "config",
            Self::Serialize {
                ..
            } => "serialization",
            Self::Timeout {
                ..
            } => "timeout",
            Self::Internal {
                ..
            } => "internal"
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// The returned string matches the [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Config {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
