//! MCP tool handlers.

use serde::Serialize;
use serde_json::Value;

use super::McpError;
use crate::Client;
use crate::query::{
    AuditServiceOperationsArgs, AuditServicesArgs, AuditSlosArgs, ListInstrumentedServicesArgs,
    SessionArgs, SkipBatchArgs,
};

fn to_value<T: Serialize>(response: &T) -> Result<Value, McpError> {
    serde_json::to_value(response)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e)))
}

pub async fn handle_audit_services(
    client: &Client,
    args: AuditServicesArgs,
) -> Result<Value, McpError> {
    let response = client.audit_services(args)?;
    to_value(&response)
}

pub async fn handle_audit_service_operations(
    client: &Client,
    args: AuditServiceOperationsArgs,
) -> Result<Value, McpError> {
    let response = client.audit_service_operations(args)?;
    to_value(&response)
}

pub async fn handle_audit_slos(client: &Client, args: AuditSlosArgs) -> Result<Value, McpError> {
    let response = client.audit_slos(args)?;
    to_value(&response)
}

/// Not-found and completed sessions come back as structured batch results.
pub async fn handle_continue_audit_batch(
    client: &Client,
    args: SessionArgs,
) -> Result<Value, McpError> {
    to_value(&client.continue_audit_batch(&args.session_id))
}

pub async fn handle_get_audit_batch_status(
    client: &Client,
    args: SessionArgs,
) -> Result<Value, McpError> {
    let progress = client.get_batch_status(&args.session_id)?;
    to_value(&progress)
}

pub async fn handle_finalize_audit_session(
    client: &Client,
    args: SessionArgs,
) -> Result<Value, McpError> {
    let response = client.finalize_audit_session(&args.session_id)?;
    to_value(&response)
}

pub async fn handle_skip_audit_batch(
    client: &Client,
    args: SkipBatchArgs,
) -> Result<Value, McpError> {
    to_value(&client.skip_audit_batch(&args.session_id, args.reason.as_deref()))
}

pub async fn handle_cancel_audit_session(
    client: &Client,
    args: SessionArgs,
) -> Result<Value, McpError> {
    let response = client.cancel_audit_session(&args.session_id)?;
    to_value(&response)
}

pub async fn handle_list_instrumented_services(
    client: &Client,
    args: ListInstrumentedServicesArgs,
) -> Result<Value, McpError> {
    let response = client.list_instrumented_services(args)?;
    to_value(&response)
}
