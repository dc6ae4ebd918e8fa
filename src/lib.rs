//! PostgreSQL MCP Server Library
//!
//! JSON-RPC 2.0 tool server exposing PostgreSQL queries, catalog
//! introspection, plan analysis and diagnostics to AI assistants.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rpc;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use db::PostgresService;
pub use error::DbError;
pub use rpc::{RpcProcessor, RpcServer};
pub use tools::ToolDispatcher;

/// Wire the full request path (processor, method server, tools, database
/// service) around one service instance.
pub fn build_processor(service: PostgresService) -> RpcProcessor {
    RpcProcessor::new(RpcServer::new(ToolDispatcher::new(service)))
}
