//! Command-line interface for the chartgen binary.
//!
//! Without a subcommand the binary serves the `create_chart` tool over
//! stdin/stdout. Logs go to stderr so they never interleave with protocol
//! messages.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

use chartgen::{
    ChartPipeline, ConfigOverrides, Error, OutputFormat, ServerConfig, VlConvertEngine, io_error,
    load_config_file, run_create_chart, serve, tool_definitions,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Persist Vega-Lite charts as data, specification, and image artifacts.
#[derive(Debug, Parser,)]
#[command(name = "chartgen", version, about = "Generate reproducible Vega-Lite chart artifacts")]
struct Cli
{
    #[command(subcommand)]
    command: Option<Command,>,

    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Debug, Subcommand,)]
/// Supported commands exposed by the CLI.
enum Command
{
    /// Serve the create_chart tool over stdin/stdout (default).
    Serve,
    /// Run a single create_chart request read from a JSON file.
    Create(CreateArgs,),
    /// Print the tool definitions advertised by the server.
    Tools,
}

/// Process-wide settings shared by every command.
#[derive(Debug, Args, Default,)]
struct SettingsArgs
{
    /// Optional YAML configuration file.
    #[arg(long = "config", value_name = "PATH", global = true, env = "CHARTGEN_CONFIG")]
    config: Option<PathBuf,>,

    /// Root directory receiving one subdirectory per chart.
    #[arg(long = "output-dir", value_name = "DIR", global = true, env = "CHARTGEN_OUTPUT_DIR")]
    output_dir: Option<PathBuf,>,

    /// Format rendered when a request does not name one (svg, png, pdf).
    #[arg(long = "output-format", value_name = "FORMAT", global = true, env = "CHARTGEN_OUTPUT_FORMAT")]
    output_format: Option<OutputFormat,>,

    /// vl-convert executable used for rendering.
    #[arg(long = "renderer", value_name = "COMMAND", global = true, env = "CHARTGEN_RENDERER")]
    renderer: Option<PathBuf,>,

    /// Deadline for a single request, in seconds.
    #[arg(long = "timeout-secs", value_name = "SECONDS", global = true, env = "CHARTGEN_TIMEOUT_SECS")]
    timeout_secs: Option<u64,>,
}

#[derive(Debug, Args,)]
struct CreateArgs
{
    /// JSON file holding the request arguments, or `-` for stdin.
    #[arg(long = "request", value_name = "PATH")]
    request: PathBuf,

    /// Output formatted JSON for easier inspection.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,
}

/// Entry point that reports errors and sets the appropriate exit status.
#[tokio::main]
async fn main()
{
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info",),),
        )
        .with_writer(io::stderr,)
        .init();

    match run().await {
        Ok(true,) => {}
        Ok(false,) => process::exit(1,),
        Err(error,) => {
            eprintln!("{}", error.to_display_string());
            process::exit(1,);
        }
    }
}

/// Executes the CLI using parsed arguments.
///
/// Returns `Ok(false)` when a one-shot request completed with a failure
/// payload.
///
/// # Errors
///
/// Propagates configuration, I/O, and serialization errors.
async fn run() -> Result<bool, Error,>
{
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Tools,) => {
            println!("{}", serde_json::to_string_pretty(&tool_definitions())?);
            Ok(true,)
        }
        Some(Command::Create(args,),) => run_create(&cli.settings, args,).await,
        Some(Command::Serve,) | None => run_serve(&cli.settings,).await.map(|()| true,),
    }
}

fn build_pipeline(settings: &SettingsArgs,) -> Result<ChartPipeline, Error,>
{
    let file = settings.config.as_deref().map(load_config_file,).transpose()?;
    let overrides = ConfigOverrides {
        output_dir:    settings.output_dir.clone(),
        output_format: settings.output_format,
        renderer:      settings.renderer.clone(),
        timeout_secs:  settings.timeout_secs,
    };
    let config = ServerConfig::resolve(file, overrides,)?;

    info!("Using output directory: {}", config.output_root.display());
    info!("Using default output format: {}", config.default_format);
    info!("Using renderer: {}", config.renderer.command.display());

    let engine = Arc::new(VlConvertEngine::from_config(&config.renderer,),);
    Ok(ChartPipeline::new(config, engine,),)
}

async fn run_serve(settings: &SettingsArgs,) -> Result<(), Error,>
{
    let pipeline = build_pipeline(settings,)?;
    let reader = tokio::io::BufReader::new(tokio::io::stdin(),);
    serve(pipeline, reader, tokio::io::stdout(),).await
}

async fn run_create(settings: &SettingsArgs, args: CreateArgs,) -> Result<bool, Error,>
{
    let pipeline = build_pipeline(settings,)?;
    let arguments = read_request(&args.request,)?;
    let result = run_create_chart(&pipeline, arguments,).await;

    let payload = result.to_payload();
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&payload,)?
    } else {
        serde_json::to_string(&payload,)?
    };
    println!("{rendered}");

    Ok(result.is_success(),)
}

fn read_request(path: &Path,) -> Result<Value, Error,>
{
    let contents = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer,).map_err(|source| io_error(path, source,),)?;
        buffer
    } else {
        fs::read_to_string(path,).map_err(|source| io_error(path, source,),)?
    };

    Ok(serde_json::from_str(&contents,)?,)
}

#[cfg(test)]
mod tests
{
    use std::{fs, path::Path};

    use clap::Parser;
    use tempfile::tempdir;

    use super::{Cli, Command, SettingsArgs, build_pipeline, read_request};

    #[test]
    fn cli_defaults_to_serving()
    {
        let cli = Cli::try_parse_from([env!("CARGO_PKG_NAME"), "--output-dir", "charts",],)
            .expect("failed to parse CLI",);

        assert!(cli.command.is_none());
        assert_eq!(cli.settings.output_dir.as_deref(), Some(Path::new("charts")));
    }

    #[test]
    fn cli_parses_create_subcommand_with_global_settings()
    {
        let cli = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "create",
            "--request",
            "request.json",
            "--output-dir",
            "charts",
            "--output-format",
            "PNG",
            "--pretty",
        ],)
        .expect("failed to parse CLI",);

        let args = match cli.command.expect("missing create command",) {
            Command::Create(args,) => args,
            other => panic!("unexpected command variant: {other:?}"),
        };
        assert!(args.pretty);
        assert_eq!(args.request, Path::new("request.json"));
        assert_eq!(cli.settings.output_format, Some(chartgen::OutputFormat::Png));
    }

    #[test]
    fn cli_rejects_unknown_output_format()
    {
        let result = Cli::try_parse_from([
            env!("CARGO_PKG_NAME"),
            "--output-dir",
            "charts",
            "--output-format",
            "jpeg",
        ],);
        assert!(result.is_err());
    }

    #[test]
    fn build_pipeline_requires_output_directory()
    {
        let settings = SettingsArgs::default();
        let error = build_pipeline(&settings,).err().expect("expected validation error",);

        match error {
            chartgen::Error::Validation {
                message,
            } => assert!(message.contains("--output-dir")),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn build_pipeline_merges_config_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let config_path = temp.path().join("chartgen.yaml",);
        fs::write(&config_path, "output_dir: from-file\noutput_format: pdf\n",).unwrap();

        let settings = SettingsArgs {
            config: Some(config_path,),
            ..SettingsArgs::default()
        };
        let pipeline = build_pipeline(&settings,).expect("pipeline should build",);

        assert_eq!(pipeline.config().output_root, Path::new("from-file"));
        assert_eq!(pipeline.config().default_format, chartgen::OutputFormat::Pdf);
    }

    #[test]
    fn read_request_parses_json_file()
    {
        let temp = tempdir().expect("failed to create tempdir",);
        let path = temp.path().join("request.json",);
        fs::write(&path, r#"{"title": "T", "vega_lite_spec": {}}"#,).unwrap();

        let value = read_request(&path,).expect("request should parse",);
        assert_eq!(value["title"], "T");
    }
}
