//! API key gate for the HTTP transport.
//!
//! A request passes when it carries one of the configured keys, either as
//! `Authorization: Bearer <key>` or as `X-API-Key: <key>`. With no keys
//! configured the gate is open.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: Vec<String>,
}

impl ApiKeys {
    /// Build the key set. Blank entries are a configuration error.
    pub fn new(keys: Vec<String>) -> Result<Self, String> {
        let mut accepted = Vec::with_capacity(keys.len());
        for key in keys {
            let key = key.trim();
            if key.is_empty() {
                return Err("Empty API key in configuration".to_string());
            }
            if !accepted.iter().any(|k: &String| k == key) {
                accepted.push(key.to_string());
            }
        }
        Ok(Self { keys: accepted })
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compare against every key without short-circuiting.
    pub fn accepts(&self, provided: &str) -> bool {
        self.keys.iter().fold(false, |found, expected| {
            found | constant_time_eq(provided.as_bytes(), expected.as_bytes())
        })
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Credential carried by a request, if any.
fn provided_key(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| "Authorization header contains invalid characters")?;
        let key = value
            .strip_prefix("Bearer ")
            .ok_or("Invalid Authorization header format. Expected 'Bearer <key>'")?
            .trim();
        if key.is_empty() {
            return Err("Bearer token is empty");
        }
        return Ok(Some(key));
    }

    match headers.get(API_KEY_HEADER) {
        Some(value) => value
            .to_str()
            .map(|key| Some(key.trim()))
            .map_err(|_| "X-API-Key header contains invalid characters"),
        None => Ok(None),
    }
}

/// Axum middleware rejecting requests without a valid key.
pub async fn require_api_key(
    State(keys): State<Arc<ApiKeys>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !keys.is_enabled() {
        return next.run(request).await;
    }

    match provided_key(request.headers()) {
        Ok(Some(key)) if keys.accepts(key) => next.run(request).await,
        Ok(Some(key)) => {
            warn!(key_prefix = %mask_key(key), "Authentication failed: invalid API key");
            unauthorized("Invalid API key")
        }
        Ok(None) => {
            warn!("Authentication failed: missing API key");
            unauthorized("Missing API key. Send 'Authorization: Bearer <key>' or 'X-API-Key: <key>'")
        }
        Err(message) => {
            warn!("Authentication failed: malformed credentials");
            unauthorized(message)
        }
    }
}

fn mask_key(key: &str) -> String {
    match key.char_indices().nth(3) {
        Some((idx, _)) => format!("{}***", &key[..idx]),
        None => "***".to_string(),
    }
}

fn unauthorized(message: &str) -> Response {
    let body = json!({
        "error": {
            "code": "unauthorized",
            "message": message,
        }
    });
    (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(name, HeaderValue::from_str(value).unwrap());
        map
    }

    #[test]
    fn test_keys_trimmed_and_deduplicated() {
        let keys = ApiKeys::new(vec![" k1 ".into(), "k1".into(), "k2".into()]).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.accepts("k1"));
        assert!(keys.accepts("k2"));
        assert!(!keys.accepts("k3"));
        assert!(!keys.accepts(""));
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(ApiKeys::new(vec!["ok".into(), "  ".into()]).is_err());
    }

    #[test]
    fn test_no_keys_disables_gate() {
        assert!(!ApiKeys::default().is_enabled());
        assert!(ApiKeys::new(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_bearer_header() {
        let h = headers(header::AUTHORIZATION, "Bearer secret");
        assert_eq!(provided_key(&h), Ok(Some("secret")));

        let h = headers(header::AUTHORIZATION, "Basic abc");
        assert!(provided_key(&h).is_err());

        let h = headers(header::AUTHORIZATION, "Bearer ");
        assert!(provided_key(&h).is_err());
    }

    #[test]
    fn test_api_key_header() {
        let h = headers(header::HeaderName::from_static(API_KEY_HEADER), "secret");
        assert_eq!(provided_key(&h), Ok(Some("secret")));
        assert_eq!(provided_key(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("abcdef"), "abc***");
        assert_eq!(mask_key("ab"), "***");
    }
}
