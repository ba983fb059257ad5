//! JSON-RPC helpers for driving the MCP server.

use anyhow::{Context, Result};
use serde_json::{Value, json};

pub fn request(id: u64, method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method })
}

pub fn call_tool(id: u64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": tool, "arguments": arguments }
    })
}

/// Newline-delimited request stream.
pub fn script(requests: &[Value]) -> String {
    requests
        .iter()
        .map(|r| format!("{r}\n"))
        .collect()
}

/// Decode the JSON text content of a `tools/call` result.
pub fn tool_payload(response: &Value) -> Result<Value> {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .with_context(|| format!("Expected text content in {response}"))?;
    serde_json::from_str(text).context("Tool content is not JSON")
}

pub fn is_tool_error(response: &Value) -> bool {
    response["result"]["isError"] == json!(true)
}
