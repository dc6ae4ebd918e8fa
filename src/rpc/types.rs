//! JSON-RPC 2.0 envelope types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

pub const PARSE_ERROR_MESSAGE: &str = "Parse error: Invalid JSON";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Request identifier. Numbers keep their JSON representation, so `1` and
/// `1.5` are echoed exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(Number),
    Null,
}

impl RequestId {
    /// Accepts only the JSON types JSON-RPC allows for an id.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::Null => Some(Self::Null),
            _ => None,
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Null => f.write_str("null"),
        }
    }
}

/// A validated request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Map<String, Value>,
    /// `None` when the envelope has no `id` member (a notification).
    pub id: Option<RequestId>,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, PARSE_ERROR_MESSAGE)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, INTERNAL_ERROR_MESSAGE)
    }
}

/// Exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "result")]
    Result(Value),
    #[serde(rename = "error")]
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl RpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: Outcome::Result(result),
        }
    }

    pub fn error(id: RequestId, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(v) => Some(v),
            Outcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(e) => Some(e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serialization() {
        let response = RpcResponse::success(1.into(), json!({"ok": true}));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}})
        );
    }

    #[test]
    fn test_error_serialization_has_no_result() {
        let response = RpcResponse::error(RequestId::Null, RpcError::parse_error());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["error"]["code"], PARSE_ERROR);
        assert!(value.get("result").is_none());
        assert!(value["error"].get("data").is_none());
    }

    #[test]
    fn test_request_id_keeps_number_representation() {
        for raw in [json!(7), json!(1.5), json!(-3), json!("abc"), json!(null)] {
            let id = RequestId::from_value(&raw).unwrap();
            assert_eq!(serde_json::to_value(&id).unwrap(), raw);
        }
        assert!(RequestId::from_value(&json!([1])).is_none());
        assert!(RequestId::from_value(&json!({"a": 1})).is_none());
        assert!(RequestId::from_value(&json!(true)).is_none());
    }

    #[test]
    fn test_response_round_trips() {
        let text = r#"{"jsonrpc":"2.0","id":"x","error":{"code":-32601,"message":"Method not found: nope"}}"#;
        let response: RpcResponse = serde_json::from_str(text).unwrap();
        assert_eq!(response.id, RequestId::from("x"));
        assert_eq!(response.error_object().unwrap().code, METHOD_NOT_FOUND);
    }
}
