//! Batch auditing of Application Signals services, operations and SLOs.
//!
//! [`Client`] runs the audit workflows: it validates caller input, expands
//! wildcard and inexact targets one lookup page at a time, and either audits
//! the result in one pass or hands it to an interactive batch session.
//! [`mcp`] exposes the same operations as MCP tools over stdio.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sigaudit_runtime::{AuditSettings, InMemoryBackend, SessionStore};
//! use sigaudit_sdk::Client;
//!
//! let client = Client::new(
//!     Arc::new(InMemoryBackend::new()),
//!     AuditSettings::default(),
//!     SessionStore::default(),
//! );
//! # let _ = client;
//! ```

pub mod client;
pub mod error;
pub mod mcp;
pub mod query;

pub use client::Client;
pub use error::{Error, Result};
