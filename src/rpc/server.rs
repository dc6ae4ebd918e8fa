//! Method dispatcher.

use crate::rpc::types::{
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PROTOCOL_VERSION, RpcError,
};
use crate::tools::{ToolDispatcher, tool_descriptors};
use serde_json::{Map, Value as JsonValue, json};
use thiserror::Error;
use tracing::{debug, warn};

pub const SERVER_NAME: &str = "postgres-mcp-server";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Routing and parameter failures that become RPC error responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Details are logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn code(&self) -> i32 {
        match self {
            Self::UnknownMethod(_) | Self::UnknownTool(_) => METHOD_NOT_FOUND,
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Self::Internal(_) => RpcError::internal_error(),
            other => RpcError::new(other.code(), other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
}

impl Method {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RpcServer {
    tools: ToolDispatcher,
}

impl RpcServer {
    pub fn new(tools: ToolDispatcher) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolDispatcher {
        &self.tools
    }

    pub async fn dispatch(
        &self,
        method: &str,
        params: Map<String, JsonValue>,
    ) -> Result<JsonValue, DispatchError> {
        let Some(resolved) = Method::parse(method) else {
            warn!(method, "Unknown method");
            return Err(DispatchError::UnknownMethod(method.to_string()));
        };

        match resolved {
            Method::Initialize => Ok(self.initialize()),
            Method::Initialized => Ok(JsonValue::Null),
            Method::Ping => Ok(json!({})),
            Method::ToolsList => Ok(json!({ "tools": tool_descriptors() })),
            Method::ToolsCall => self.call_tool(params).await,
            Method::ResourcesList => Ok(json!({ "resources": [] })),
        }
    }

    fn initialize(&self) -> JsonValue {
        // Warm the pool without holding up the handshake.
        let service = self.tools.service().clone();
        tokio::spawn(async move {
            match service.ensure_ready().await {
                Ok(()) => debug!("Connection pool warmed up"),
                Err(e) => warn!(error = %e, "Connection pool warm-up failed"),
            }
        });

        json!({
            "protocol_version": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "resources": { "listChanged": false }
            },
            "server_info": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION
            }
        })
    }

    async fn call_tool(&self, mut params: Map<String, JsonValue>) -> Result<JsonValue, DispatchError> {
        let name = match params.remove("name") {
            Some(JsonValue::String(name)) => name,
            Some(_) => return Err(DispatchError::InvalidParams("tool name must be a string".into())),
            None => return Err(DispatchError::InvalidParams("missing tool name".into())),
        };
        let arguments = match params.remove("arguments") {
            None | Some(JsonValue::Null) => Map::new(),
            Some(JsonValue::Object(arguments)) => arguments,
            Some(_) => {
                return Err(DispatchError::InvalidParams(
                    "tool arguments must be an object".into(),
                ));
            }
        };

        let output = self.tools.call(&name, arguments).await?;
        serde_json::to_value(output).map_err(|e| DispatchError::Internal(e.to_string()))
    }
}
