//! HTTP transport.
//!
//! `POST <endpoint>` takes one JSON-RPC envelope per request body. `GET
//! <endpoint>` returns a short server description. Both sit behind the API
//! key gate; `/api` and `/api/health` do not.

use crate::auth::{ApiKeys, require_api_key};
use crate::error::{DbError, DbResult};
use crate::rpc::types::PARSE_ERROR;
use crate::rpc::{RpcProcessor, RpcResponse, SERVER_NAME, SERVER_VERSION};
use crate::transport::{Transport, wait_for_signal};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// How long in-flight requests get after a shutdown signal.
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpTransport {
    processor: RpcProcessor,
    api_keys: Arc<ApiKeys>,
    host: String,
    port: u16,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(
        processor: RpcProcessor,
        api_keys: ApiKeys,
        host: impl Into<String>,
        port: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            api_keys: Arc::new(api_keys),
            host: host.into(),
            port,
            endpoint: endpoint.into(),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Routes for the RPC endpoint and the unauthenticated status pages.
    pub fn router(&self) -> Router {
        let rpc = Router::new()
            .route(&self.endpoint, get(describe).post(handle_rpc))
            .route_layer(middleware::from_fn_with_state(
                self.api_keys.clone(),
                require_api_key,
            ))
            .with_state(self.processor.clone());

        Router::new()
            .route("/api", get(api_root))
            .route("/api/health", get(health))
            .merge(rpc)
    }
}

impl Transport for HttpTransport {
    async fn run(&self) -> DbResult<()> {
        let bind_addr = self.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
            DbError::transport(format!("Failed to bind to {}: {}", bind_addr, e))
        })?;

        info!(
            addr = %bind_addr,
            endpoint = %self.endpoint,
            auth = self.api_keys.is_enabled(),
            "HTTP transport listening"
        );

        let shutdown = Arc::new(tokio::sync::Notify::new());
        let notify = shutdown.clone();
        let server = axum::serve(listener, self.router()).with_graceful_shutdown(async move {
            wait_for_signal().await;
            notify.notify_one();
        });

        tokio::select! {
            result = server => {
                if let Err(e) = result {
                    error!(error = %e, "HTTP server error");
                    return Err(DbError::transport(format!("HTTP server error: {}", e)));
                }
                info!("HTTP server stopped");
            }
            _ = async {
                shutdown.notified().await;
                info!(
                    timeout_secs = GRACEFUL_TIMEOUT.as_secs(),
                    "Waiting for in-flight requests (send signal again to force exit)"
                );
                tokio::select! {
                    _ = tokio::time::sleep(GRACEFUL_TIMEOUT) => {
                        warn!("Graceful shutdown timeout, forcing exit");
                    }
                    _ = wait_for_signal() => {
                        warn!("Received second signal, forcing exit");
                    }
                }
            } => {}
        }

        info!("Closing database connections");
        self.processor.server().tools().service().close().await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

async fn handle_rpc(State(processor): State<RpcProcessor>, body: Bytes) -> Response {
    let response = processor.handle_slice(&body).await;
    rpc_http_response(response)
}

/// Map a processor outcome to an HTTP response.
///
/// Parse errors answer 400; every other envelope answers 200, including RPC
/// errors. A notification without a reply answers 202 with no body.
pub fn rpc_http_response(response: Option<RpcResponse>) -> Response {
    match response {
        None => StatusCode::ACCEPTED.into_response(),
        Some(response) => {
            let status = match response.error_object() {
                Some(err) if err.code == PARSE_ERROR => StatusCode::BAD_REQUEST,
                _ => StatusCode::OK,
            };
            debug!(id = %response.id, status = status.as_u16(), "Sending response");
            (status, Json(response)).into_response()
        }
    }
}

async fn describe() -> Json<serde_json::Value> {
    Json(json!({
        "message": "Welcome to the PostgreSQL MCP API!",
        "protocol": "JSON-RPC 2.0",
        "server": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
        }
    }))
}

async fn api_root() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Welcome to the Postgres MCP Service!" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "message": "Server is healthy" }))
}
