//! Testing infrastructure for sigaudit integration tests.
//!
//! - `TestWorld`: an isolated client, backend and temp directory
//! - `fixtures`: sample entity catalogs
//! - `rpc`: JSON-RPC request builders and response accessors

pub mod fixtures;
pub mod rpc;
pub mod world;

pub use world::TestWorld;
