// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Process-wide configuration for the chart server.
//!
//! Settings are assembled once at startup from command line flags, an
//! optional YAML document, and built-in defaults (in that order of
//! precedence). The resulting [`ServerConfig`] is immutable and is handed to
//! the pipeline explicitly, so tests can point it at temporary roots.

use std::{fs, path::Path, path::PathBuf, time::Duration};

use serde::Deserialize;

use crate::{
    error::{self, Error},
    format::OutputFormat,
};

/// Executable invoked by the default render engine.
pub const DEFAULT_RENDERER_COMMAND: &str = "vl-convert";
/// Deadline applied to a single `create_chart` call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// YAML configuration document.
///
/// # Examples
///
/// ```
/// use chartgen::{ConfigFile, OutputFormat};
///
/// let yaml = r#"
/// output_dir: charts
/// output_format: png
/// renderer:
///   command: /usr/local/bin/vl-convert
///   png_scale: 2.0
/// "#;
/// let config: ConfigFile = serde_yaml::from_str(yaml,).expect("valid configuration",);
/// assert_eq!(config.output_format, Some(OutputFormat::Png));
/// ```
#[derive(Debug, Clone, Default, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile
{
    /// Root directory receiving artifact directories.
    #[serde(default, alias = "output-dir")]
    pub output_dir: Option<PathBuf,>,

    /// Format rendered when a request does not name one.
    #[serde(default, alias = "output-format")]
    pub output_format: Option<OutputFormat,>,

    /// Deadline for a single request in seconds.
    #[serde(default, alias = "request-timeout-secs")]
    pub request_timeout_secs: Option<u64,>,

    /// Render engine settings.
    #[serde(default)]
    pub renderer: Option<RendererSection,>,
}

/// Renderer block of the YAML configuration.
#[derive(Debug, Clone, Default, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct RendererSection
{
    /// Executable path or name looked up on `PATH`.
    #[serde(default)]
    pub command: Option<PathBuf,>,

    /// Arguments inserted before the conversion subcommand.
    #[serde(default)]
    pub args: Option<Vec<String,>,>,

    /// Scale factor applied to PNG exports.
    #[serde(default, alias = "png-scale")]
    pub png_scale: Option<f32,>,

    /// Vega-Lite version requested from the engine.
    #[serde(default, alias = "vl-version")]
    pub vl_version: Option<String,>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default,)]
pub struct ConfigOverrides
{
    /// Overrides [`ConfigFile::output_dir`].
    pub output_dir:    Option<PathBuf,>,
    /// Overrides [`ConfigFile::output_format`].
    pub output_format: Option<OutputFormat,>,
    /// Overrides the renderer command.
    pub renderer:      Option<PathBuf,>,
    /// Overrides [`ConfigFile::request_timeout_secs`].
    pub timeout_secs:  Option<u64,>,
}

/// Resolved render engine settings.
#[derive(Debug, Clone, PartialEq,)]
pub struct RendererConfig
{
    /// Executable path or name looked up on `PATH`.
    pub command:    PathBuf,
    /// Arguments inserted before the conversion subcommand.
    pub args:       Vec<String,>,
    /// Scale factor applied to PNG exports.
    pub png_scale:  Option<f32,>,
    /// Vega-Lite version requested from the engine.
    pub vl_version: Option<String,>,
}

impl Default for RendererConfig
{
    fn default() -> Self
    {
        Self {
            command:    PathBuf::from(DEFAULT_RENDERER_COMMAND,),
            args:       Vec::new(),
            png_scale:  None,
            vl_version: None,
        }
    }
}

/// Immutable configuration shared by every request.
#[derive(Debug, Clone, PartialEq,)]
pub struct ServerConfig
{
    /// Root directory receiving artifact directories.
    pub output_root:     PathBuf,
    /// Format rendered when a request does not name one.
    pub default_format:  OutputFormat,
    /// Render engine settings.
    pub renderer:        RendererConfig,
    /// Deadline applied by the transport to a single request.
    pub request_timeout: Duration,
}

impl ServerConfig
{
    /// Creates a configuration writing under `output_root` with defaults for
    /// every other setting.
    pub fn new(output_root: impl Into<PathBuf,>,) -> Self
    {
        Self {
            output_root:     output_root.into(),
            default_format:  OutputFormat::default(),
            renderer:        RendererConfig::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS,),
        }
    }

    /// Returns the configuration with a different default format.
    pub fn with_default_format(mut self, format: OutputFormat,) -> Self
    {
        self.default_format = format;
        self
    }

    /// Merges command line overrides over an optional configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when no output directory is configured,
    /// the timeout is zero, or the PNG scale is not a positive finite number.
    pub fn resolve(file: Option<ConfigFile,>, overrides: ConfigOverrides,) -> Result<Self, Error,>
    {
        let file = file.unwrap_or_default();
        let section = file.renderer.unwrap_or_default();

        let output_root = overrides.output_dir.or(file.output_dir,).ok_or_else(|| {
            Error::validation(
                "output directory must be provided via --output-dir or the configuration file",
            )
        },)?;
        if output_root.as_os_str().is_empty() {
            return Err(Error::validation("output directory must not be empty",),);
        }

        let timeout_secs = overrides
            .timeout_secs
            .or(file.request_timeout_secs,)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS,);
        if timeout_secs == 0 {
            return Err(Error::validation("request timeout must be at least one second",),);
        }

        if let Some(scale,) = section.png_scale
            && !(scale.is_finite() && scale > 0.0)
        {
            return Err(Error::validation(format!(
                "renderer.png_scale must be a positive number, got {scale}"
            ),),);
        }

        let renderer = RendererConfig {
            command:    overrides
                .renderer
                .or(section.command,)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER_COMMAND,),),
            args:       section.args.unwrap_or_default(),
            png_scale:  section.png_scale,
            vl_version: section.vl_version,
        };

        Ok(Self {
            output_root,
            default_format: overrides.output_format.or(file.output_format,).unwrap_or_default(),
            renderer,
            request_timeout: Duration::from_secs(timeout_secs,),
        },)
    }
}

/// Loads a YAML configuration document from `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read and [`Error::Config`]
/// when it is not a valid configuration document.
pub fn load_config_file(path: &Path,) -> Result<ConfigFile, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_config_file(&contents,)
}

/// Parses a YAML configuration document.
///
/// # Errors
///
/// Returns [`Error::Config`] when the document cannot be decoded.
pub fn parse_config_file(contents: &str,) -> Result<ConfigFile, Error,>
{
    Ok(serde_yaml::from_str(contents,)?,)
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn server_config_new_applies_defaults()
    {
        let config = ServerConfig::new("charts",);
        assert_eq!(config.output_root, PathBuf::from("charts"));
        assert_eq!(config.default_format, OutputFormat::Svg);
        assert_eq!(config.renderer.command, PathBuf::from(DEFAULT_RENDERER_COMMAND));
        assert_eq!(config.request_timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn parse_config_file_reads_all_sections()
    {
        let yaml = r"
output_dir: /srv/charts
output_format: pdf
request_timeout_secs: 30
renderer:
  command: npx
  args: [vl-convert]
  png_scale: 1.5
  vl_version: '5.16'
";
        let file = parse_config_file(yaml,).expect("valid configuration",);
        let config = ServerConfig::resolve(Some(file,), ConfigOverrides::default(),).unwrap();

        assert_eq!(config.output_root, PathBuf::from("/srv/charts"));
        assert_eq!(config.default_format, OutputFormat::Pdf);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.renderer, RendererConfig {
            command:    PathBuf::from("npx"),
            args:       vec!["vl-convert".to_owned()],
            png_scale:  Some(1.5),
            vl_version: Some("5.16".to_owned()),
        });
    }

    #[test]
    fn parse_config_file_rejects_unknown_keys()
    {
        let error = parse_config_file("output_dir: charts\ncolour: blue\n",).unwrap_err();
        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn parse_config_file_rejects_unsupported_format()
    {
        let error = parse_config_file("output_format: jpeg\n",).unwrap_err();
        assert!(matches!(error, Error::Config { .. }));
    }

    #[test]
    fn overrides_take_precedence_over_file()
    {
        let file = parse_config_file("output_dir: from-file\noutput_format: pdf\n",).unwrap();
        let overrides = ConfigOverrides {
            output_dir:    Some(PathBuf::from("from-cli",),),
            output_format: Some(OutputFormat::Png,),
            renderer:      Some(PathBuf::from("/opt/vl-convert",),),
            timeout_secs:  Some(5,),
        };

        let config = ServerConfig::resolve(Some(file,), overrides,).unwrap();

        assert_eq!(config.output_root, PathBuf::from("from-cli"));
        assert_eq!(config.default_format, OutputFormat::Png);
        assert_eq!(config.renderer.command, PathBuf::from("/opt/vl-convert"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn resolve_requires_output_directory()
    {
        let error = ServerConfig::resolve(None, ConfigOverrides::default(),).unwrap_err();
        match error {
            Error::Validation {
                message,
            } => assert!(message.contains("--output-dir")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn resolve_rejects_zero_timeout()
    {
        let overrides = ConfigOverrides {
            output_dir: Some(PathBuf::from("charts",),),
            timeout_secs: Some(0,),
            ..ConfigOverrides::default()
        };
        assert!(ServerConfig::resolve(None, overrides,).is_err());
    }

    #[test]
    fn resolve_rejects_non_positive_png_scale()
    {
        let file = parse_config_file("output_dir: charts\nrenderer:\n  png_scale: -1.0\n",).unwrap();
        let error = ServerConfig::resolve(Some(file,), ConfigOverrides::default(),).unwrap_err();
        assert!(error.to_string().contains("png_scale"));
    }

    #[test]
    fn load_config_file_reports_missing_file()
    {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing.yaml",);
        let error = load_config_file(&path,).unwrap_err();
        assert!(matches!(error, Error::Io { .. }));
    }

    #[test]
    fn load_config_file_reads_from_disk()
    {
        let temp = tempdir().unwrap();
        let path = temp.path().join("chartgen.yaml",);
        fs::write(&path, "output_dir: charts\n",).unwrap();

        let file = load_config_file(&path,).unwrap();
        assert_eq!(file.output_dir, Some(PathBuf::from("charts")));
    }
}
