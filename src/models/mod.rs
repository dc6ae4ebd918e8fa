//! Data models for the PostgreSQL MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod analysis;
pub mod connection;
pub mod diagnostics;
pub mod query;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use analysis::{AnalysisResult, PerformanceMetrics, PlanMetrics};
pub use connection::{ConnectionStatus, ConnectionTarget};
pub use diagnostics::{
    DEFAULT_SLOW_QUERY_LIMIT, DatabaseSize, DatabaseSizeReport, LockReport, MAX_SLOW_QUERY_LIMIT,
    SlowQueryReport, TableSize, clamp_slow_query_limit,
};
pub use query::{
    AFFECTED_ROWS_UNKNOWN, MutationResult, QueryFailure, QueryResult, SelectResult,
    StatementKind, command_tag, parse_affected_rows,
};
pub use schema::{
    ColumnDescriptor, IndexDescriptor, SchemaReport, SchemaTables, TableDescriptor, TableInfo,
    TableMetadata,
};
pub use value::{CellRow, CellValue, row_into_json};
