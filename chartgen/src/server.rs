// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Line-delimited JSON-RPC transport exposing the `create_chart` tool.
///
/// Messages follow the Model Context Protocol tool shape: one JSON object per
/// line on the input, one response per request on the output, nothing for
/// notifications. Each tool call runs on a blocking worker bounded by the
/// configured request timeout; a call that times out is abandoned in place.
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::{
    error::{self, Error},
    normalizer::ChartRequest,
    pipeline::ChartPipeline,
    report::OperationResult,
};

/// Name of the only tool exposed by the server.
pub const TOOL_NAME: &str = "create_chart";
/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize,)]
struct RpcRequest
{
    #[serde(default, deserialize_with = "present_id")]
    id:     Option<Value,>,
    method: String,
    #[serde(default)]
    params: Value,
}

// Only a missing `id` marks a notification; an explicit `null` still
// expects a response.
fn present_id<'de, D,>(deserializer: D,) -> Result<Option<Value,>, D::Error,>
where
    D: Deserializer<'de,>,
{
    Value::deserialize(deserializer,).map(Some,)
}

#[derive(Debug, Deserialize,)]
struct CallParams
{
    name:      String,
    #[serde(default)]
    arguments: Value,
}

/// Returns the `tools/list` result describing `create_chart`.
pub fn tool_definitions() -> Value
{
    let format_name = json!({"type": "string", "enum": ["svg", "png", "pdf"]});

    json!({
        "tools": [{
            "name": TOOL_NAME,
            "description": "Render a Vega-Lite chart and save data.json, vega_lite_spec.json and graph.<format> into a new directory named after the title",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "Chart title; also names the artifact directory"
                    },
                    "data": {
                        "type": "array",
                        "items": {"type": "object"},
                        "description": "Records bound to the chart as data.values; every record must have the same fields"
                    },
                    "vega_lite_spec": {
                        "type": "object",
                        "description": "Vega-Lite specification; its data block is replaced by the records above"
                    },
                    "format": {
                        "description": "Output format or list of formats; defaults to the server setting",
                        "oneOf": [
                            format_name,
                            {"type": "array", "items": format_name, "minItems": 1}
                        ]
                    }
                },
                "required": ["title", "vega_lite_spec"]
            }
        }]
    })
}

/// Serves requests read from `reader` until it reaches end of input.
///
/// # Errors
///
/// Returns [`Error::Io`] when reading input or writing a response fails.
pub async fn serve<R, W,>(pipeline: ChartPipeline, reader: R, mut writer: W,) -> Result<(), Error,>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line,) =
        lines.next_line().await.map_err(|source| error::io_error(Path::new("<stdin>",), source,),)?
    {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(response,) = handle_message(&pipeline, trimmed,).await {
            let mut encoded = serde_json::to_vec(&response,)?;
            encoded.push(b'\n',);
            writer
                .write_all(&encoded,)
                .await
                .map_err(|source| error::io_error(Path::new("<stdout>",), source,),)?;
            writer
                .flush()
                .await
                .map_err(|source| error::io_error(Path::new("<stdout>",), source,),)?;
        }
    }

    info!("Input closed, shutting down");
    Ok((),)
}

/// Handles one JSON-RPC message and returns the response, if any.
pub async fn handle_message(pipeline: &ChartPipeline, line: &str,) -> Option<Value,>
{
    let request: RpcRequest = match serde_json::from_str(line,) {
        Ok(request,) => request,
        Err(e,) => {
            warn!("Discarding unparsable message: {e}");
            return Some(error_response(Value::Null, PARSE_ERROR, format!("parse error: {e}"),),);
        }
    };

    let Some(id,) = request.id else {
        debug!("Received notification {}", request.method);
        return None;
    };

    let outcome = match request.method.as_str() {
        "initialize" => Ok(initialize_result(&request.params,),),
        "ping" => Ok(json!({}),),
        "tools/list" => Ok(tool_definitions(),),
        "tools/call" => call_tool(pipeline, request.params,).await,
        other => Err((METHOD_NOT_FOUND, format!("method not found: {other}"),),),
    };

    Some(match outcome {
        Ok(result,) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err((code, message,),) => error_response(id, code, message,),
    },)
}

/// Runs `create_chart` on a blocking worker bounded by the request timeout.
pub async fn run_create_chart(pipeline: &ChartPipeline, arguments: Value,) -> OperationResult
{
    let request = match ChartRequest::from_arguments(arguments,) {
        Ok(request,) => request,
        Err(error,) => return OperationResult::failure(&error,),
    };

    let timeout = pipeline.config().request_timeout;
    let worker = pipeline.clone();
    let task = tokio::task::spawn_blocking(move || worker.create_chart(request,),);

    match tokio::time::timeout(timeout, task,).await {
        Ok(Ok(result,),) => result,
        Ok(Err(join_error,),) => OperationResult::failure(&Error::Internal {
            message: format!("chart worker stopped: {join_error}"),
        },),
        Err(_,) => {
            warn!("create_chart exceeded {}s, abandoning request", timeout.as_secs());
            OperationResult::failure(&Error::Timeout {
                seconds: timeout.as_secs(),
            },)
        }
    }
}

async fn call_tool(pipeline: &ChartPipeline, params: Value,) -> Result<Value, (i64, String,),>
{
    let params: CallParams = serde_json::from_value(params,)
        .map_err(|e| (INVALID_PARAMS, format!("invalid tools/call params: {e}"),),)?;
    if params.name != TOOL_NAME {
        return Err((INVALID_PARAMS, format!("unknown tool: {}", params.name),),);
    }

    let result = run_create_chart(pipeline, params.arguments,).await;
    let payload = result.to_payload();

    Ok(json!({
        "content": [{"type": "text", "text": payload.to_string()}],
        "structuredContent": payload,
        "isError": !result.is_success()
    }),)
}

fn initialize_result(params: &Value,) -> Value
{
    let version = params["protocolVersion"].as_str().unwrap_or(PROTOCOL_VERSION,);

    json!({
        "protocolVersion": version,
        "capabilities": {"tools": {}},
        "serverInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}
    })
}

fn error_response(id: Value, code: i64, message: String,) -> Value
{
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}
