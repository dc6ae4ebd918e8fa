//! Server-level diagnostic reports.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Default number of statements returned by the slow query report.
pub const DEFAULT_SLOW_QUERY_LIMIT: u32 = 10;

/// Upper bound for the slow query report.
pub const MAX_SLOW_QUERY_LIMIT: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSize {
    pub database_name: String,
    pub size_pretty: String,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSize {
    pub schemaname: String,
    pub tablename: String,
    pub total_size: String,
    pub table_size: String,
    pub indexes_size: String,
    pub total_bytes: i64,
}

/// Size of the current database and its largest tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSizeReport {
    pub database: DatabaseSize,
    pub largest_tables: Vec<TableSize>,
}

/// Statements from `pg_stat_statements`, slowest mean time first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlowQueryReport {
    pub slow_queries: Vec<Map<String, JsonValue>>,
}

/// Locks held or awaited by other sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockReport {
    pub locks_count: usize,
    pub locks: Vec<Map<String, JsonValue>>,
}

impl LockReport {
    pub fn new(locks: Vec<Map<String, JsonValue>>) -> Self {
        Self {
            locks_count: locks.len(),
            locks,
        }
    }
}

/// Clamp a requested slow query limit to the supported range.
pub fn clamp_slow_query_limit(limit: Option<i64>) -> u32 {
    match limit {
        None => DEFAULT_SLOW_QUERY_LIMIT,
        Some(l) => l.clamp(1, MAX_SLOW_QUERY_LIMIT as i64) as u32,
    }
}
