//! Envelope processor.
//!
//! Parse, validate, dispatch, wrap. No state survives between requests.
//! Every failure becomes an error response; a successful notification
//! produces no response at all.

use crate::rpc::server::RpcServer;
use crate::rpc::types::{INTERNAL_ERROR, JSONRPC_VERSION, RequestId, RpcError, RpcRequest, RpcResponse};
use serde_json::{Map, Value as JsonValue};
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub struct RpcProcessor {
    server: RpcServer,
}

impl RpcProcessor {
    pub fn new(server: RpcServer) -> Self {
        Self { server }
    }

    pub fn server(&self) -> &RpcServer {
        &self.server
    }

    /// Handle one raw JSON text frame.
    pub async fn handle_text(&self, text: &str) -> Option<RpcResponse> {
        self.handle_slice(text.as_bytes()).await
    }

    /// Handle one raw request body.
    pub async fn handle_slice(&self, body: &[u8]) -> Option<RpcResponse> {
        match serde_json::from_slice::<JsonValue>(body) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Invalid JSON in request");
                Some(RpcResponse::error(RequestId::Null, RpcError::parse_error()))
            }
        }
    }

    /// Handle one already-parsed envelope.
    pub async fn handle_value(&self, value: JsonValue) -> Option<RpcResponse> {
        let request = match validate(value) {
            Ok(request) => request,
            Err((id, err)) => {
                debug!(code = err.code, message = %err.message, "Rejected envelope");
                return Some(RpcResponse::error(id, err));
            }
        };

        let RpcRequest { method, params, id } = request;
        debug!(method = %method, id = ?id, "Handling request");

        // A panicking handler surfaces as a join error instead of tearing
        // down the connection task.
        let server = self.server.clone();
        let dispatched = {
            let method = method.clone();
            tokio::spawn(async move { server.dispatch(&method, params).await }).await
        };

        let outcome = match dispatched {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => {
                if e.code() == INTERNAL_ERROR {
                    error!(method = %method, error = %e, "Request failed");
                }
                Err(e.to_rpc_error())
            }
            Err(join_error) => {
                error!(method = %method, error = %join_error, "Request handler aborted");
                Err(RpcError::internal_error())
            }
        };

        match (outcome, id) {
            (Ok(_), None) => None,
            (Ok(result), Some(id)) => Some(RpcResponse::success(id, result)),
            (Err(err), id) => Some(RpcResponse::error(id.unwrap_or(RequestId::Null), err)),
        }
    }
}

/// Check envelope structure.
///
/// On failure returns the id to echo (null when it could not be read) and the
/// error to send.
pub fn validate(value: JsonValue) -> Result<RpcRequest, (RequestId, RpcError)> {
    let mut envelope = match value {
        JsonValue::Object(map) => map,
        JsonValue::Array(_) => {
            return Err((
                RequestId::Null,
                RpcError::invalid_request("Batch requests are not supported"),
            ));
        }
        _ => {
            return Err((
                RequestId::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        }
    };

    let id = match envelope.get("id") {
        None => None,
        Some(raw) => Some(RequestId::from_value(raw).ok_or_else(|| {
            (
                RequestId::Null,
                RpcError::invalid_request("Invalid id: expected a string, number or null"),
            )
        })?),
    };
    let echo = || id.clone().unwrap_or(RequestId::Null);

    if envelope.get("jsonrpc").and_then(JsonValue::as_str) != Some(JSONRPC_VERSION) {
        return Err((
            echo(),
            RpcError::invalid_request("Invalid jsonrpc version: expected \"2.0\""),
        ));
    }

    let method = match envelope.remove("method") {
        Some(JsonValue::String(method)) => method,
        _ => {
            return Err((
                echo(),
                RpcError::invalid_request("Missing or invalid method"),
            ));
        }
    };

    let params = match envelope.remove("params") {
        None | Some(JsonValue::Null) => Map::new(),
        Some(JsonValue::Object(params)) => params,
        Some(_) => {
            return Err((echo(), RpcError::invalid_params("params must be an object")));
        }
    };

    Ok(RpcRequest { method, params, id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::types::{INVALID_PARAMS, INVALID_REQUEST};
    use serde_json::json;

    fn rejected(value: JsonValue) -> (RequestId, RpcError) {
        validate(value).unwrap_err()
    }

    #[test]
    fn test_valid_request() {
        let request = validate(json!({
            "jsonrpc": "2.0", "method": "tools/list", "id": "a-1"
        }))
        .unwrap();
        assert_eq!(request.method, "tools/list");
        assert_eq!(request.id, Some(RequestId::from("a-1")));
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_missing_id_is_notification() {
        let request = validate(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_explicit_null_id_is_not_a_notification() {
        let request = validate(json!({"jsonrpc": "2.0", "method": "ping", "id": null})).unwrap();
        assert_eq!(request.id, Some(RequestId::Null));
    }

    #[test]
    fn test_non_object_envelopes() {
        for value in [json!([]), json!("x"), json!(3), json!(null)] {
            let (id, err) = rejected(value);
            assert_eq!(id, RequestId::Null);
            assert_eq!(err.code, INVALID_REQUEST);
        }
    }

    #[test]
    fn test_bad_id_type_gets_null_id() {
        let (id, err) = rejected(json!({"jsonrpc": "2.0", "method": "ping", "id": [1]}));
        assert_eq!(id, RequestId::Null);
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn test_bad_version_echoes_id() {
        let (id, err) = rejected(json!({"jsonrpc": "1.0", "method": "ping", "id": 9}));
        assert_eq!(id, RequestId::from(9));
        assert_eq!(err.code, INVALID_REQUEST);

        let (_, err) = rejected(json!({"method": "ping", "id": 9}));
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn test_bad_method_echoes_id() {
        let (id, err) = rejected(json!({"jsonrpc": "2.0", "method": 5, "id": "m"}));
        assert_eq!(id, RequestId::from("m"));
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn test_non_object_params() {
        let (id, err) = rejected(json!({
            "jsonrpc": "2.0", "method": "tools/call", "params": [1, 2], "id": 4
        }));
        assert_eq!(id, RequestId::from(4));
        assert_eq!(err.code, INVALID_PARAMS);
    }
}
