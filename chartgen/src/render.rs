// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Chart rendering through an external engine.
///
/// The engine is a capability boundary: anything implementing
/// [`RenderEngine`] can turn a bound specification into image bytes. The
/// shipped [`VlConvertEngine`] drives the `vl-convert` command line tool.
use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use rayon::prelude::*;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    allocator::ArtifactDirectory,
    config::RendererConfig,
    error::{self, Error},
    format::OutputFormat,
    normalizer::NormalizedSpec,
};

/// Converts a fully bound specification into image bytes.
///
/// Implementations report rejected documents as [`Error::Render`]. They must
/// be shareable across threads because formats render in parallel.
pub trait RenderEngine: Send + Sync
{
    /// Exports `document` as an image in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] when the document cannot be rendered.
    fn export(&self, document: &Value, format: OutputFormat,) -> Result<Vec<u8,>, Error,>;
}

/// Image written into an artifact directory.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RenderedArtifact
{
    /// Format of the image.
    pub format: OutputFormat,
    /// Encoded image payload.
    pub bytes:  Vec<u8,>,
    /// Location the image was written to.
    pub path:   PathBuf,
}

/// Result of rendering one requested format.
#[derive(Debug,)]
pub struct RenderOutcome
{
    /// Format that was attempted.
    pub format: OutputFormat,
    /// Written artifact, or the error that stopped it.
    pub result: Result<RenderedArtifact, Error,>,
}

/// Renders normalized specifications and writes the images to disk.
#[derive(Clone, Copy,)]
pub struct ChartRenderer<'engine,>
{
    engine: &'engine dyn RenderEngine,
}

impl<'engine,> ChartRenderer<'engine,>
{
    /// Creates a renderer delegating to `engine`.
    pub fn new(engine: &'engine dyn RenderEngine,) -> Self
    {
        Self {
            engine,
        }
    }

    /// Renders `format` and writes it to `graph.<ext>` inside `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] when the engine rejects the document and
    /// [`Error::Io`] when the image cannot be written.
    pub fn render(
        &self,
        normalized: &NormalizedSpec,
        format: OutputFormat,
        directory: &ArtifactDirectory,
    ) -> Result<RenderedArtifact, Error,>
    {
        self.render_document(&normalized.document_value(), format, directory,)
    }

    /// Renders every requested format independently.
    ///
    /// Outcomes follow the order of [`NormalizedSpec::formats`]. A failure in
    /// one format never prevents the others from being attempted.
    pub fn render_all(
        &self,
        normalized: &NormalizedSpec,
        directory: &ArtifactDirectory,
    ) -> Vec<RenderOutcome,>
    {
        let document = normalized.document_value();

        normalized
            .formats
            .par_iter()
            .map(|&format| RenderOutcome {
                format,
                result: self.render_document(&document, format, directory,),
            },)
            .collect()
    }

    fn render_document(
        &self,
        document: &Value,
        format: OutputFormat,
        directory: &ArtifactDirectory,
    ) -> Result<RenderedArtifact, Error,>
    {
        let bytes = self.engine.export(document, format,).map_err(|error| {
            warn!("Rendering {} for {} failed: {}", format, directory.slug, error);
            match error {
                Error::Render {
                    ..
                } => error,
                other => Error::render(format, other.to_string(),),
            }
        },)?;

        let path = directory.join(&format.file_name(),);
        fs::write(&path, &bytes,).map_err(|source| error::io_error(&path, source,),)?;
        info!("Rendered {} chart: {}", format.as_str().to_uppercase(), path.display());

        Ok(RenderedArtifact {
            format,
            bytes,
            path,
        },)
    }
}

/// Engine backed by the `vl-convert` command line tool.
///
/// Each export writes the document to a scratch directory, runs
/// `<command> [args…] vl2<ext> --input <spec> --output <image>` and reads the
/// image back.
#[derive(Debug, Clone,)]
pub struct VlConvertEngine
{
    command:    PathBuf,
    args:       Vec<String,>,
    png_scale:  Option<f32,>,
    vl_version: Option<String,>,
}

impl VlConvertEngine
{
    /// Creates an engine from renderer settings.
    pub fn from_config(config: &RendererConfig,) -> Self
    {
        Self {
            command:    config.command.clone(),
            args:       config.args.clone(),
            png_scale:  config.png_scale,
            vl_version: config.vl_version.clone(),
        }
    }

    fn build_command(&self, format: OutputFormat, input: &Path, output: &Path,) -> Command
    {
        let mut command = Command::new(&self.command,);
        command
            .args(&self.args,)
            .arg(format!("vl2{}", format.as_str()),)
            .arg("--input",)
            .arg(input,)
            .arg("--output",)
            .arg(output,);

        if let Some(version,) = self.vl_version.as_deref() {
            command.arg("--vl-version",).arg(version,);
        }
        if format == OutputFormat::Png
            && let Some(scale,) = self.png_scale
        {
            command.arg("--scale",).arg(scale.to_string(),);
        }

        command
    }
}

impl RenderEngine for VlConvertEngine
{
    fn export(&self, document: &Value, format: OutputFormat,) -> Result<Vec<u8,>, Error,>
    {
        let scratch = tempfile::Builder::new()
            .prefix("chartgen-",)
            .tempdir()
            .map_err(|e| Error::render(format, format!("failed to create scratch directory: {e}"),),)?;
        let input = scratch.path().join("spec.json",);
        let output = scratch.path().join(format.file_name(),);

        let encoded = serde_json::to_vec(document,)
            .map_err(|e| Error::render(format, format!("failed to encode specification: {e}"),),)?;
        fs::write(&input, encoded,)
            .map_err(|e| Error::render(format, format!("failed to stage specification: {e}"),),)?;

        let result = self.build_command(format, &input, &output,).output().map_err(|e| {
            Error::render(format, format!("failed to launch {}: {e}", self.command.display()),)
        },)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr,);
            let message = match stderr.trim() {
                "" => format!("{} exited with {}", self.command.display(), result.status),
                diagnostic => diagnostic.to_owned(),
            };
            return Err(Error::render(format, message,),);
        }

        let image = fs::read(&output,)
            .map_err(|e| Error::render(format, format!("renderer produced no output: {e}"),),)?;
        if image.is_empty() {
            return Err(Error::render(format, "renderer produced an empty image",),);
        }

        Ok(image,)
    }
}
