//! Configuration handling for the PostgreSQL MCP server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use clap::{Parser, ValueEnum};
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8000;
pub const DEFAULT_MCP_ENDPOINT: &str = "/mcp";

pub const DEFAULT_PG_HOST: &str = "localhost";
pub const DEFAULT_PG_PORT: u16 = 5432;
pub const DEFAULT_PG_USER: &str = "postgres";
pub const DEFAULT_PG_PASSWORD: &str = "postgres";
pub const DEFAULT_PG_DATABASE: &str = "postgres";

// Pool configuration defaults
pub const DEFAULT_MIN_CONNECTIONS: u32 = 5;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 60;

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// JSON-RPC over HTTP POST
    #[default]
    Http,
    /// Line-delimited JSON-RPC over standard input/output
    Stdio,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Stdio => write!(f, "stdio"),
        }
    }
}

/// Target database coordinates, held as a `postgres://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    url: Url,
}

impl DatabaseSettings {
    /// Assemble settings from individual parts. The password is percent-encoded.
    pub fn from_parts(
        host: &str,
        port: u16,
        user: &str,
        password: &str,
        database: &str,
    ) -> Result<Self, String> {
        let mut url =
            Url::parse("postgres://localhost").map_err(|e| format!("Invalid URL: {e}"))?;
        url.set_host(Some(host))
            .map_err(|e| format!("Invalid host '{host}': {e}"))?;
        url.set_port(Some(port))
            .map_err(|_| format!("Invalid port {port}"))?;
        url.set_username(user)
            .map_err(|_| format!("Invalid user '{user}'"))?;
        url.set_password(Some(password))
            .map_err(|_| "Invalid password".to_string())?;
        url.set_path(database);
        Ok(Self { url })
    }

    /// Parse settings from a full `postgres://` URL.
    pub fn from_url(s: &str) -> Result<Self, String> {
        let url = Url::parse(s).map_err(|e| format!("Invalid URL: {e}"))?;
        let scheme = url.scheme();
        if scheme != "postgres" && scheme != "postgresql" {
            return Err(format!(
                "Unsupported scheme '{scheme}'. Expected postgres:// or postgresql://"
            ));
        }
        if url.host_str().is_none() {
            return Err("Connection URL must include a host".to_string());
        }
        Ok(Self { url })
    }

    /// The connection string handed to the driver (sensitive - not logged).
    pub fn connection_string(&self) -> &str {
        self.url.as_str()
    }

    /// Connection string with the password replaced by `***`, safe for logs.
    pub fn redacted_connection_string(&self) -> String {
        let mut url = self.url.clone();
        if url.password().is_some() {
            // Only fails for URLs that cannot carry credentials, which from_url rejects.
            let _ = url.set_password(Some("***"));
        }
        url.to_string()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or(DEFAULT_PG_HOST)
    }

    pub fn port(&self) -> u16 {
        self.url.port().unwrap_or(DEFAULT_PG_PORT)
    }

    pub fn user(&self) -> &str {
        self.url.username()
    }

    pub fn database(&self) -> &str {
        let name = self.url.path().trim_start_matches('/');
        if name.is_empty() { DEFAULT_PG_DATABASE } else { name }
    }
}

/// Connection pool bounds and timeouts. Fixed once the pool is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Upper bound on a single statement round trip.
    pub query_timeout: Duration,
}

impl PoolSettings {
    /// Validate pool options and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }
        if self.min_connections > self.max_connections {
            return Err(format!(
                "min_connections ({}) cannot exceed max_connections ({})",
                self.min_connections, self.max_connections
            ));
        }
        Ok(())
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
        }
    }
}

/// Configuration for the PostgreSQL MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pg-mcp-server",
    about = "JSON-RPC tool server exposing PostgreSQL queries and diagnostics",
    version,
    author
)]
pub struct Config {
    /// PostgreSQL host
    #[arg(long, default_value = DEFAULT_PG_HOST, env = "POSTGRES_HOST")]
    pub pg_host: String,

    /// PostgreSQL port
    #[arg(long, default_value_t = DEFAULT_PG_PORT, env = "POSTGRES_PORT")]
    pub pg_port: u16,

    /// PostgreSQL user
    #[arg(long, default_value = DEFAULT_PG_USER, env = "POSTGRES_USER")]
    pub pg_user: String,

    /// PostgreSQL password
    #[arg(
        long,
        default_value = DEFAULT_PG_PASSWORD,
        env = "POSTGRES_PASSWORD",
        hide_env_values = true
    )]
    pub pg_password: String,

    /// PostgreSQL database name
    #[arg(long, default_value = DEFAULT_PG_DATABASE, env = "POSTGRES_DB")]
    pub pg_database: String,

    /// Full connection URL. Overrides the individual --pg-* settings when set.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Minimum pooled connections
    #[arg(long, default_value_t = DEFAULT_MIN_CONNECTIONS, env = "PGMCP_MIN_CONNECTIONS")]
    pub min_connections: u32,

    /// Maximum pooled connections
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS, env = "PGMCP_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_ACQUIRE_TIMEOUT_SECS,
        env = "PGMCP_ACQUIRE_TIMEOUT"
    )]
    pub acquire_timeout: u64,

    /// Statement timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "PGMCP_QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Transport mode (http or stdio)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "http",
        env = "PGMCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(long = "host", default_value = DEFAULT_HTTP_HOST, env = "HOST")]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(long = "port", default_value_t = DEFAULT_HTTP_PORT, env = "PORT")]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(long, default_value = DEFAULT_MCP_ENDPOINT, env = "PGMCP_ENDPOINT")]
    pub mcp_endpoint: String,

    /// API keys accepted on the MCP endpoint.
    /// Can be specified multiple times or as comma-separated values.
    /// When empty, the endpoint is unauthenticated.
    #[arg(
        long = "api-key",
        value_name = "KEY",
        env = "PGMCP_API_KEY",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub api_keys: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "PGMCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "PGMCP_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            pg_host: DEFAULT_PG_HOST.to_string(),
            pg_port: DEFAULT_PG_PORT,
            pg_user: DEFAULT_PG_USER.to_string(),
            pg_password: DEFAULT_PG_PASSWORD.to_string(),
            pg_database: DEFAULT_PG_DATABASE.to_string(),
            database_url: None,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT_SECS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            transport: TransportMode::Http,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            api_keys: Vec::new(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Resolve the target database, preferring `--database-url` when given.
    pub fn database_settings(&self) -> Result<DatabaseSettings, String> {
        match &self.database_url {
            Some(url) => DatabaseSettings::from_url(url),
            None => DatabaseSettings::from_parts(
                &self.pg_host,
                self.pg_port,
                &self.pg_user,
                &self.pg_password,
                &self.pg_database,
            ),
        }
    }

    /// Pool settings, validated.
    pub fn pool_settings(&self) -> Result<PoolSettings, String> {
        let settings = PoolSettings {
            min_connections: self.min_connections,
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
            query_timeout: Duration::from_secs(self.query_timeout),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
