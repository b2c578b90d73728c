// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! End-to-end `create_chart` pipeline.
//!
//! normalize → allocate → write inputs → render → report. Validation runs
//! before any filesystem side effect; once a directory is allocated it is
//! never rolled back, whatever happens afterwards.

use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    allocator::allocate,
    config::ServerConfig,
    error::Error,
    normalizer::{ChartRequest, normalize},
    render::{ChartRenderer, RenderEngine},
    report::{self, OperationResult},
    writer::write_inputs
};

/// Stateless chart pipeline bound to an immutable configuration.
///
/// Cloning is cheap; clones share the configuration and engine.
#[derive(Clone)]
pub struct ChartPipeline {
    config: Arc<ServerConfig>,
    engine: Arc<dyn RenderEngine>
}

impl ChartPipeline {
    /// Creates a pipeline writing under `config.output_root` and rendering
    /// through `engine`.
    pub fn new(config: ServerConfig, engine: Arc<dyn RenderEngine>) -> Self {
        Self {
            config: Arc::new(config),
            engine
        }
    }

    /// Configuration the pipeline was created with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs the pipeline and folds any error into a failed result.
    pub fn create_chart(&self, request: ChartRequest) -> OperationResult {
        match self.execute(request) {
            Ok(result) => result,
            Err(error) => {
                warn!("Chart request failed: {error}");
                OperationResult::failure(&error)
            }
        }
    }

    /// Runs the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for malformed requests (before anything
    /// touches the filesystem) and [`Error::Io`] when the directory or a file
    /// cannot be written. Render failures are reported as warnings on the
    /// successful result instead.
    pub fn execute(&self, request: ChartRequest) -> Result<OperationResult, Error> {
        let normalized = normalize(request, self.config.default_format)?;
        let directory = allocate(&self.config.output_root, &normalized.title)?;
        info!("Allocated artifact directory: {}", directory.path.display());

        let written = write_inputs(&directory, &normalized)?;
        info!("Saved data and Vega-Lite specification for '{}'", normalized.title);

        let outcomes = ChartRenderer::new(self.engine.as_ref()).render_all(&normalized, &directory);
        report::build(&directory, written, outcomes)
    }
}
