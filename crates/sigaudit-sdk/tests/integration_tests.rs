//! Integration tests for sigaudit-sdk
//!
//! These drive the public `Client` and MCP server against the in-memory
//! backend.

mod scenarios {
    mod batch_session;
    mod expansion;
    mod mcp_protocol;
}
