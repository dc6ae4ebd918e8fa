//! Error types for the PostgreSQL MCP server.
//!
//! Backend failures are modelled by [`DbError`]. They never cross the tool
//! boundary as RPC errors: tool handlers turn them into `isError` payloads.
//! Routing and envelope failures live in [`crate::rpc::DispatchError`].

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// The pool could not be opened or the link to the server broke.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// PostgreSQL rejected the statement; carries the server's message.
    #[error("Database error: {0}")]
    Rejected(String),

    #[error("Timeout: {operation} exceeded {}s", .limit.as_secs())]
    Timeout { operation: String, limit: Duration },

    /// Shown to the caller verbatim.
    #[error("{0}")]
    InvalidInput(String),

    #[error("Table {schema}.{table} not found")]
    TableNotFound { schema: String, table: String },

    /// stdio or HTTP listener failure.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn timeout(operation: impl Into<String>, limit: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            limit,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn table_not_found(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self::TableNotFound {
            schema: schema.into(),
            table: table.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Classify driver errors by where they came from: the server, the link, or
/// row decoding.
///
/// `PoolTimedOut` lands in [`DbError::Connection`] here; the pool manager
/// reports it as a [`DbError::Timeout`] with its configured acquire limit.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::Error as E;
        match &err {
            E::Database(server) => Self::Rejected(server.message().to_string()),
            E::Configuration(_)
            | E::Io(_)
            | E::Tls(_)
            | E::Protocol(_)
            | E::PoolTimedOut
            | E::PoolClosed => Self::Connection(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message_is_verbatim() {
        let err = DbError::invalid_input("Query cannot be empty");
        assert_eq!(err.to_string(), "Query cannot be empty");
    }

    #[test]
    fn test_table_not_found_message() {
        let err = DbError::table_not_found("public", "missing");
        assert_eq!(err.to_string(), "Table public.missing not found");
    }

    #[test]
    fn test_timeout_reports_whole_seconds() {
        let err = DbError::timeout("query execution", Duration::from_millis(12_400));
        assert_eq!(err.to_string(), "Timeout: query execution exceeded 12s");
    }

    #[test]
    fn test_link_failures_are_connection_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        assert!(matches!(DbError::from(sqlx::Error::Io(io)), DbError::Connection(_)));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolClosed),
            DbError::Connection(_)
        ));
    }

    #[test]
    fn test_decode_failures_are_internal() {
        let err = DbError::from(sqlx::Error::ColumnNotFound("missing".into()));
        assert!(matches!(err, DbError::Internal(_)));
        assert!(err.to_string().contains("missing"));
    }
}
