//! MCP (Model Context Protocol) server.
//!
//! Exposes the [`Client`](crate::Client) audit workflows as tools over
//! line-delimited JSON-RPC on stdio.

pub mod error;
mod server;
mod tools;

pub use error::{ErrorCode, McpError};
pub use server::{SigAuditServer, run_server, serve_io, tool_definitions};
