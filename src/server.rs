use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::file_utility::FileUtility;
use crate::tools::{
    escape_filename, get_file_info, get_file_type, list_supported_extensions, validate_file_size,
    FilenameParams, GetFileTypeParams, ValidateFileSizeParams,
};

const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-06-18", "2025-11-25"];

const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const NOT_INITIALIZED: i32 = -32002;
const REQUEST_FAILED: i32 = -32000;

/// JSON-RPC request structure
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

/// JSON-RPC response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    jsonrpc: String,
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}

/// MCP Initialize request parameters
#[derive(Debug, Deserialize)]
struct InitializeParams {
    #[serde(rename = "protocolVersion")]
    protocol_version: String,
    #[serde(rename = "clientInfo")]
    client_info: Option<Value>,
}

/// MCP Tool definition
#[derive(Debug, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

fn tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "get_file_type",
            description: "Map a file extension to its document type (word, cell or slide).",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "file_ext": {
                        "type": "string",
                        "description": "File extension without the leading dot"
                    }
                },
                "required": ["file_ext"]
            }),
        },
        Tool {
            name: "get_file_info",
            description: "Split a filename into name and extension and report its document type and editing capabilities.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "File name, optionally with a path"
                    }
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "escape_filename",
            description: "Replace path separators in a filename so it is safe to use as a single path element.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "File name to sanitize"
                    }
                },
                "required": ["filename"]
            }),
        },
        Tool {
            name: "validate_file_size",
            description: "Send a HEAD request to a URL and check that its Content-Length does not exceed a limit. If no limit is provided, uses the configured max_file_size.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "http:// or https:// URL of the file"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Optional size limit in bytes"
                    }
                },
                "required": ["url"]
            }),
        },
        Tool {
            name: "list_supported_extensions",
            description: "List every supported extension grouped by editing capability.",
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}

/// JSON-RPC session state over an injected `FileUtility`
pub struct Server<U: FileUtility> {
    utility: U,
    config: Config,
    initialized: bool,
}

impl<U: FileUtility> Server<U> {
    pub fn new(utility: U, config: Config) -> Self {
        Self {
            utility,
            config,
            initialized: false,
        }
    }

    /// Serve line-delimited JSON-RPC until `reader` reaches EOF
    ///
    /// Request failures become error responses. I/O failures on `writer` are returned.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read request line")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(response) = self.handle_line(line).await else {
                continue;
            };

            let response_json = serde_json::to_string(&response)
                .context("Failed to serialize response - critical error")?;
            writer
                .write_all(response_json.as_bytes())
                .await
                .context("Failed to write response - critical I/O error")?;
            writer
                .write_all(b"\n")
                .await
                .context("Failed to write response - critical I/O error")?;
            writer.flush().await.context("Failed to flush response - critical I/O error")?;
        }

        debug!("Input closed, stopping server");
        Ok(())
    }

    /// Handle one raw line. Returns `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let request = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => request,
            Err(e) => {
                error!(error = %e, line, "Failed to parse JSON-RPC request");
                return Some(JsonRpcResponse::failure(
                    None,
                    PARSE_ERROR,
                    "Parse error",
                    Some(Value::String(e.to_string())),
                ));
            }
        };

        if request.jsonrpc != "2.0" {
            error!(version = %request.jsonrpc, "Invalid JSON-RPC version");
            return Some(JsonRpcResponse::failure(
                request.id,
                INVALID_REQUEST,
                format!("Invalid JSON-RPC version: {}. Expected 2.0", request.jsonrpc),
                None,
            ));
        }

        if request.id.is_none() {
            if let Err(e) = self.handle_notification(&request) {
                error!(method = %request.method, "Notification failed: {}", e);
            }
            return None;
        }

        let response = match self.handle_request(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(method = %request.method, "Request failed: {:#}", e);
                JsonRpcResponse::failure(
                    request.id.clone(),
                    REQUEST_FAILED,
                    format!("Request failed: {:#}", e),
                    Some(Value::String(e.to_string())),
                )
            }
        };

        Some(response)
    }

    fn handle_notification(&mut self, request: &JsonRpcRequest) -> Result<()> {
        match request.method.as_str() {
            "initialized" | "notifications/initialized" => {
                if !self.initialized {
                    return Err(anyhow::anyhow!("Received initialized notification before initialize request"));
                }
                Ok(())
            }
            other => {
                debug!(method = other, "Ignoring unknown notification");
                Ok(())
            }
        }
    }

    async fn handle_request(&mut self, request: &JsonRpcRequest) -> Result<JsonRpcResponse> {
        let id = request.id.clone();

        if request.method != "initialize" && !self.initialized {
            return Ok(JsonRpcResponse::failure(id, NOT_INITIALIZED, "Not initialized", None));
        }

        match request.method.as_str() {
            "initialize" => self.initialize(id, request.params.clone()),
            "tools/list" => Ok(JsonRpcResponse::success(
                id,
                serde_json::json!({ "tools": tool_definitions() }),
            )),
            "tools/call" => self.call_tool(id, request.params.as_ref()).await,
            "ping" => Ok(JsonRpcResponse::success(id, serde_json::json!({}))),
            other => Ok(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {}", other),
                None,
            )),
        }
    }

    fn initialize(&mut self, id: Option<Value>, params: Option<Value>) -> Result<JsonRpcResponse> {
        if self.initialized {
            return Ok(JsonRpcResponse::failure(id, REQUEST_FAILED, "Already initialized", None));
        }

        let params: InitializeParams = serde_json::from_value(
            params.unwrap_or(Value::Object(serde_json::Map::new())),
        )
        .context("Failed to parse initialize params")?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            warn!(version = %params.protocol_version, "Unsupported protocol version");
            return Ok(JsonRpcResponse::failure(
                id,
                REQUEST_FAILED,
                format!(
                    "Unsupported protocol version: {}. Supported versions: {}",
                    params.protocol_version,
                    SUPPORTED_PROTOCOL_VERSIONS.join(", ")
                ),
                None,
            ));
        }

        info!(
            version = %params.protocol_version,
            client = ?params.client_info,
            "Client initialized"
        );
        self.initialized = true;

        Ok(JsonRpcResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": params.protocol_version,
                "capabilities": {
                    "tools": { "listChanged": false }
                },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ))
    }

    async fn call_tool(&self, id: Option<Value>, params: Option<&Value>) -> Result<JsonRpcResponse> {
        let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for tools/call"))?;

        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Missing tool name"))?;

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or(Value::Object(serde_json::Map::new()));

        debug!(tool = tool_name, "Calling tool");

        let result = match tool_name {
            "get_file_type" => {
                let params: GetFileTypeParams = serde_json::from_value(arguments)
                    .context("Failed to parse get_file_type params")?;
                serde_json::to_value(get_file_type(&self.utility, params)?)?
            }
            "get_file_info" => {
                let params: FilenameParams = serde_json::from_value(arguments)
                    .context("Failed to parse get_file_info params")?;
                serde_json::to_value(get_file_info(&self.utility, params)?)?
            }
            "escape_filename" => {
                let params: FilenameParams = serde_json::from_value(arguments)
                    .context("Failed to parse escape_filename params")?;
                serde_json::to_value(escape_filename(&self.utility, params)?)?
            }
            "validate_file_size" => {
                let params: ValidateFileSizeParams = serde_json::from_value(arguments)
                    .context("Failed to parse validate_file_size params")?;
                serde_json::to_value(validate_file_size(&self.utility, &self.config, params).await?)?
            }
            "list_supported_extensions" => serde_json::to_value(list_supported_extensions())?,
            _ => {
                return Ok(JsonRpcResponse::failure(
                    id,
                    METHOD_NOT_FOUND,
                    format!("Unknown tool: {}", tool_name),
                    None,
                ));
            }
        };

        Ok(JsonRpcResponse::success(
            id,
            serde_json::json!({ "content": [{ "type": "text", "text": serde_json::to_string(&result)? }] }),
        ))
    }
}

/// Run the server on stdin/stdout
pub async fn run_server(utility: impl FileUtility, config: Config) -> Result<()> {
    info!("Starting {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let mut server = Server::new(utility, config);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
