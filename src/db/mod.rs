//! Database layer.
//!
//! - Lazily created, single-flight connection pool
//! - Query execution and row decoding
//! - Schema introspection
//! - Execution plan analysis and server diagnostics

pub mod analyzer;
pub mod diagnostics;
pub mod executor;
pub mod pool;
pub mod schema;
pub mod service;
pub mod types;

pub use analyzer::{PerformanceAnalyzer, extract_metrics};
pub use diagnostics::{Diagnostics, MISSING_STAT_STATEMENTS};
pub use executor::{EMPTY_QUERY_MESSAGE, QueryExecutor, QueryParam};
pub use pool::PoolManager;
pub use schema::{DEFAULT_SCHEMA, SchemaInspector, quote_ident};
pub use service::PostgresService;
