// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Reproducible Vega-Lite chart artifacts.
//!
//! The library turns a `create_chart` request (title, Vega-Lite
//! specification and tabular data) into a uniquely named directory holding
//! `data.json`, `vega_lite_spec.json` and one `graph.<ext>` image per
//! requested format. Requests are validated before anything touches the
//! filesystem, directory names are allocated atomically so concurrent calls
//! never share a directory, and render failures are reported as warnings
//! rather than discarding the persisted inputs.
//!
//! [`ChartPipeline`] drives a single call; [`serve`] exposes it as a tool
//! over a line-delimited JSON-RPC stream.

mod allocator;
mod config;
mod error;
mod format;
mod normalizer;
mod pipeline;
mod render;
mod report;
mod server;
mod slug;
mod writer;

pub use allocator::{ArtifactDirectory, allocate};
pub use config::{
    ConfigFile, ConfigOverrides, DEFAULT_RENDERER_COMMAND, DEFAULT_REQUEST_TIMEOUT_SECS,
    RendererConfig, RendererSection, ServerConfig, load_config_file, parse_config_file
};
pub use error::{Error, io_error};
pub use format::OutputFormat;
pub use normalizer::{
    ChartRequest, FormatSelection, MAX_SPEC_DEPTH, NormalizedSpec, Record, normalize
};
pub use pipeline::ChartPipeline;
pub use render::{ChartRenderer, RenderEngine, RenderOutcome, RenderedArtifact, VlConvertEngine};
pub use report::{ErrorReport, OperationResult, Status, build as build_report};
pub use server::{
    PROTOCOL_VERSION, TOOL_NAME, handle_message, run_create_chart, serve, tool_definitions
};
pub use slug::{FALLBACK_SLUG, MAX_SLUG_LEN, SlugStrategy};
pub use writer::{DATA_FILE, SPEC_FILE, canonical_json, write_inputs};
