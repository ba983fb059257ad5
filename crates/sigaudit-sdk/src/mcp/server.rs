//! MCP JSON-RPC server.

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::io::{BufRead, Write};

use crate::Client;
use crate::query::{
    AuditServiceOperationsArgs, AuditServicesArgs, AuditSlosArgs, ListInstrumentedServicesArgs,
    SessionArgs, SkipBatchArgs,
};

use super::McpError;
use super::tools::{
    handle_audit_service_operations, handle_audit_services, handle_audit_slos,
    handle_cancel_audit_session, handle_continue_audit_batch, handle_finalize_audit_session,
    handle_get_audit_batch_status, handle_list_instrumented_services, handle_skip_audit_batch,
};

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl JsonRpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }
}

fn input_schema<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| json!({ "type": "object" }))
}

/// The `tools/list` result: every tool with its generated input schema.
pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": "audit_services",
                "description": "Audit services for SLO breaches and metric anomalies. Wildcard names ('*', '*payment*') expand against one page of services; follow pagination.resume to audit the next page. Up to the batch size the audit runs now, larger sets start an interactive session.",
                "inputSchema": input_schema::<AuditServicesArgs>(),
            },
            {
                "name": "audit_service_operations",
                "description": "Audit service operations for one metric family (Latency, Availability, Fault, Error). Service and operation names accept '*' wildcards.",
                "inputSchema": input_schema::<AuditServiceOperationsArgs>(),
            },
            {
                "name": "audit_slos",
                "description": "Audit service level objectives. SLO names accept '*' wildcards expanded against one page of SLOs.",
                "inputSchema": input_schema::<AuditSlosArgs>(),
            },
            {
                "name": "continue_audit_batch",
                "description": "Audit the next batch of an interactive session. WORKFLOW: call repeatedly until the session status is 'completed'. A failed batch is retryable: calling again retries the same batch.",
                "inputSchema": input_schema::<SessionArgs>(),
            },
            {
                "name": "get_audit_batch_status",
                "description": "Show progress of an interactive audit session without running anything.",
                "inputSchema": input_schema::<SessionArgs>(),
            },
            {
                "name": "finalize_audit_session",
                "description": "Combine the findings of every processed batch into one report. Skipped batches are listed as batch_errors. Safe to call more than once.",
                "inputSchema": input_schema::<SessionArgs>(),
            },
            {
                "name": "skip_audit_batch",
                "description": "Skip the current batch of an interactive session, e.g. after repeated failures, and move to the next one.",
                "inputSchema": input_schema::<SkipBatchArgs>(),
            },
            {
                "name": "cancel_audit_session",
                "description": "Discard an interactive audit session and its findings.",
                "inputSchema": input_schema::<SessionArgs>(),
            },
            {
                "name": "list_instrumented_services",
                "description": "List one page of services that emit Application Signals telemetry. Uninstrumented and AWS native entries are filtered out.",
                "inputSchema": input_schema::<ListInstrumentedServicesArgs>(),
            }
        ]
    })
}

pub struct SigAuditServer {
    client: Client,
}

impl SigAuditServer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Convert serde deserialization error to MCP-compliant JSON-RPC error
    fn parse_validation_error(tool_name: &str, error: serde_json::Error) -> JsonRpcError {
        let error_msg = error.to_string();

        if error_msg.contains("missing field") {
            if let Some(field_start) = error_msg.find('`') {
                if let Some(field_end) = error_msg[field_start + 1..].find('`') {
                    let field_name = &error_msg[field_start + 1..field_start + 1 + field_end];
                    return JsonRpcError {
                        code: -32602,
                        message: format!(
                            "Invalid params: missing required field \"{}\"",
                            field_name
                        ),
                        data: Some(json!({
                            "missing": [field_name],
                            "tool": tool_name,
                        })),
                    };
                }
            }
        }

        JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {}", error),
            data: Some(json!({
                "tool": tool_name,
                "detail": error_msg,
            })),
        }
    }

    fn parse_args<T: DeserializeOwned>(
        tool_name: &str,
        arguments: Value,
    ) -> Result<T, JsonRpcError> {
        serde_json::from_value(arguments).map_err(|e| Self::parse_validation_error(tool_name, e))
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request
            .id
            .clone()
            .unwrap_or_else(|| Value::Number(serde_json::Number::from(0)));

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            _ => JsonRpcResponse::failure(
                id,
                JsonRpcError {
                    code: -32601,
                    message: format!("Method not found: {}", request.method),
                    data: None,
                },
            ),
        }
    }

    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "sigaudit",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": "SigAudit MCP Server - batch audits of Application Signals services, operations and SLOs. Targets may use '*' wildcards; large target sets run as interactive batch sessions driven with continue_audit_batch."
            }),
        )
    }

    fn handle_list_tools(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, tool_definitions())
    }

    async fn handle_call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::failure(id, JsonRpcError::invalid_params("Missing params"));
        };
        let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::failure(id, JsonRpcError::invalid_params("Missing tool name"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match self.dispatch(tool_name, arguments).await {
            Ok(Ok(content)) => JsonRpcResponse::success(
                id,
                json!({
                    "content": [
                        {
                            "type": "text",
                            "text": serde_json::to_string(&content).unwrap_or_else(|_| content.to_string())
                        }
                    ]
                }),
            ),
            Ok(Err(err)) => {
                tracing::warn!(tool = tool_name, code = ?err.code, "tool call failed: {}", err.message);
                let text = serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone());
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [
                            {
                                "type": "text",
                                "text": text
                            }
                        ],
                        "isError": true
                    }),
                )
            }
            Err(rpc_error) => JsonRpcResponse::failure(id, rpc_error),
        }
    }

    /// Outer error: the call itself was malformed. Inner error: the tool failed.
    async fn dispatch(
        &self,
        tool_name: &str,
        arguments: Value,
    ) -> Result<Result<Value, McpError>, JsonRpcError> {
        let client = &self.client;
        let result = match tool_name {
            "audit_services" => {
                handle_audit_services(client, Self::parse_args(tool_name, arguments)?).await
            }
            "audit_service_operations" => {
                handle_audit_service_operations(client, Self::parse_args(tool_name, arguments)?)
                    .await
            }
            "audit_slos" => {
                handle_audit_slos(client, Self::parse_args(tool_name, arguments)?).await
            }
            "continue_audit_batch" => {
                handle_continue_audit_batch(client, Self::parse_args(tool_name, arguments)?).await
            }
            "get_audit_batch_status" => {
                handle_get_audit_batch_status(client, Self::parse_args(tool_name, arguments)?).await
            }
            "finalize_audit_session" => {
                handle_finalize_audit_session(client, Self::parse_args(tool_name, arguments)?).await
            }
            "skip_audit_batch" => {
                handle_skip_audit_batch(client, Self::parse_args(tool_name, arguments)?).await
            }
            "cancel_audit_session" => {
                handle_cancel_audit_session(client, Self::parse_args(tool_name, arguments)?).await
            }
            "list_instrumented_services" => {
                handle_list_instrumented_services(client, Self::parse_args(tool_name, arguments)?)
                    .await
            }
            _ => {
                return Err(JsonRpcError::invalid_params(format!("Unknown tool: {}", tool_name)));
            }
        };
        Ok(result)
    }

    /// Answer one raw input line. `None` for blank lines.
    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
            Ok(request) => {
                tracing::debug!(method = %request.method, "handling request");
                self.handle_request(request).await
            }
            // Parse errors carry no usable id, so a sentinel is used.
            Err(e) => JsonRpcResponse::failure(
                Value::Number(serde_json::Number::from(-1)),
                JsonRpcError {
                    code: -32700,
                    message: format!("Parse error: {}", e),
                    data: None,
                },
            ),
        };
        Some(response)
    }
}

/// Serve requests from `reader` until EOF, writing one response per line.
///
/// All batch sessions are dropped when the input closes.
pub async fn serve_io<R: BufRead, W: Write>(
    client: Client,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()> {
    let server = SigAuditServer::new(client);
    tracing::info!("MCP server ready");

    for line in reader.lines() {
        let line = line?;
        if let Some(response) = server.handle_line(&line).await {
            let response_json = serde_json::to_string(&response)?;
            writeln!(writer, "{}", response_json)?;
            writer.flush()?;
        }
    }

    let cleared = server.client.clear_sessions();
    tracing::info!(cleared, "input closed, shutting down");
    Ok(())
}

/// Run the MCP server over stdio.
pub async fn run_server(client: Client) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    serve_io(client, stdin.lock(), std::io::stdout()).await
}
