//! PostgreSQL MCP Server - Main entry point.

use clap::Parser;
use pg_mcp_server::auth::ApiKeys;
use pg_mcp_server::config::{Config, TransportMode};
use pg_mcp_server::transport::{HttpTransport, StdioTransport, Transport};
use pg_mcp_server::{PostgresService, build_processor};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the tracing subscriber. Output goes to stderr so stdout stays
/// reserved for JSON-RPC frames in stdio mode.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_tracing(&config);

    let database = config.database_settings()?;
    let pool_settings = config.pool_settings()?;
    let api_keys = ApiKeys::new(config.api_keys.clone())?;

    info!(
        transport = %config.transport,
        target_db = %database.redacted_connection_string(),
        "Starting PostgreSQL MCP Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // The pool is created lazily by the first request or by `initialize`.
    let processor = build_processor(PostgresService::new(database, pool_settings));

    let result = match config.transport {
        TransportMode::Stdio => StdioTransport::new(processor).run().await,
        TransportMode::Http => {
            HttpTransport::new(
                processor,
                api_keys,
                &config.http_host,
                config.http_port,
                &config.mcp_endpoint,
            )
            .run()
            .await
        }
    };

    if let Err(e) = result {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
