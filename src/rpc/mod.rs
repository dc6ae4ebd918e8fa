//! JSON-RPC 2.0 layer.
//!
//! - `types`: envelope types and error codes
//! - `processor`: envelope validation and response wrapping
//! - `server`: method dispatch (`initialize`, `tools/list`, `tools/call`, `resources/list`)

pub mod processor;
pub mod server;
pub mod types;

pub use processor::RpcProcessor;
pub use server::{DispatchError, RpcServer, SERVER_NAME, SERVER_VERSION};
pub use types::{RequestId, RpcError, RpcRequest, RpcResponse};
