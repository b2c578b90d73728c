// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Output formats supported by the chart renderer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Image format produced for a chart.
///
/// # Examples
///
/// ```
/// use chartgen::OutputFormat;
///
/// let format: OutputFormat = " SVG ".parse().expect("svg is supported");
/// assert_eq!(format, OutputFormat::Svg);
/// assert_eq!(format.file_name(), "graph.svg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Scalable vector graphics.
    #[default]
    Svg,
    /// Portable network graphics raster.
    Png,
    /// Portable document format.
    Pdf
}

impl OutputFormat {
    /// Every supported format in canonical order.
    pub const ALL: [Self; 3] = [Self::Svg, Self::Png, Self::Pdf];

    /// Lower-case name used in requests, file extensions and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
            Self::Pdf => "pdf"
        }
    }

    /// Name of the rendered image inside an artifact directory.
    pub fn file_name(self) -> String {
        format!("graph.{}", self.as_str())
    }

    /// Parses a user-supplied format name, ignoring case and surrounding
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for names other than svg, png and pdf.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == normalized)
            .ok_or_else(|| {
                Error::validation(format!(
                    "unsupported output format '{}'; expected one of svg, png, pdf",
                    value.trim()
                ))
            })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}
