//! JSON-RPC 2.0 over stdio.
//!
//! One request per line on stdin, one response per line on stdout.
//! Notifications (requests without an id) receive no response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::SharedState;
use crate::error::RpcError;
use crate::research::render_report;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null when the request had none).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
}

/// Parameters for a research.run or research.report request.
#[derive(Debug, Deserialize)]
pub struct RunParams {
    /// The research question.
    pub prompt: String,
    /// Caller identifier, used in logs only.
    #[serde(rename = "agentId", default)]
    pub agent_id: Option<String>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error code for an [`RpcError`]
fn error_code(err: &RpcError) -> i32 {
    match err {
        RpcError::InvalidRequest { .. } => -32600,
        RpcError::UnknownMethod { .. } => -32601,
        RpcError::InvalidParameters { .. } => -32602,
        RpcError::RunFailed { .. } => -32000,
        RpcError::Json(_) => -32603,
    }
}

/// Research server running over stdio.
pub struct RpcServer {
    /// Shared application state.
    state: SharedState,
}

impl RpcServer {
    /// Create a new server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("Deep research server starting...");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Only send a response for requests, never for notifications.
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request.
    /// Returns None for notifications (requests without id).
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                -32600,
                "Invalid request: jsonrpc must be \"2.0\"",
            ));
        }

        match request.method.as_str() {
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            "research.run" => Some(self.handle_run(request.id, request.params, false).await),
            "research.report" => Some(self.handle_run(request.id, request.params, true).await),
            // Kept for callers that still send it. Limits are per-run, read
            // from the environment at startup; nothing here to mutate.
            "research.configure" => {
                debug!("Ignoring research.configure; configuration is per-run");
                Some(JsonRpcResponse::success(
                    request.id,
                    json!({ "applied": false }),
                ))
            }
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    let err = RpcError::UnknownMethod {
                        method: method.to_string(),
                    };
                    Some(JsonRpcResponse::error(
                        request.id,
                        error_code(&err),
                        err.to_string(),
                    ))
                }
            }
        }
    }

    /// Run research; `as_report` selects markdown over structured JSON
    async fn handle_run(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        as_report: bool,
    ) -> JsonRpcResponse {
        let params = match parse_run_params(params) {
            Ok(params) => params,
            Err(err) => {
                return JsonRpcResponse::error(id, error_code(&err), err.to_string());
            }
        };

        match self
            .state
            .engine
            .research(&params.prompt, params.agent_id.as_deref())
            .await
        {
            Ok(result) => {
                let payload = if as_report {
                    json!({ "success": true, "report": render_report(&result) })
                } else {
                    match serde_json::to_value(&result) {
                        Ok(value) => json!({ "success": true, "result": value }),
                        Err(e) => {
                            let err = RpcError::Json(e);
                            return JsonRpcResponse::error(id, error_code(&err), err.to_string());
                        }
                    }
                };
                JsonRpcResponse::success(id, payload)
            }
            Err(e) => {
                error!(error = %e, "Research run failed");
                let err = RpcError::RunFailed {
                    message: e.to_string(),
                };
                JsonRpcResponse::error(id, error_code(&err), err.to_string())
            }
        }
    }
}

fn parse_run_params(params: Option<Value>) -> Result<RunParams, RpcError> {
    let params = params.ok_or_else(|| RpcError::InvalidParameters {
        method: "research.run".to_string(),
        message: "params object is required".to_string(),
    })?;
    let params: RunParams =
        serde_json::from_value(params).map_err(|e| RpcError::InvalidParameters {
            method: "research.run".to_string(),
            message: e.to_string(),
        })?;
    if params.prompt.trim().is_empty() {
        return Err(RpcError::InvalidParameters {
            method: "research.run".to_string(),
            message: "prompt must not be empty".to_string(),
        });
    }
    Ok(params)
}
