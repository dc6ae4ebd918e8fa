//! Tool table.
//!
//! The tool set is closed: [`ToolName`] enumerates every tool and `match`
//! statements over it are exhaustive. Descriptors are built once per
//! `tools/list` call from the same enum.
//!
//! - `echo`: returns its message
//! - `postgres_connection_test`: round trip with version/database/user
//! - `postgres_query`: run arbitrary SQL with bound parameters
//! - `postgres_schema`, `postgres_table_info`: catalog introspection
//! - `postgres_query_analyze`: `EXPLAIN ANALYZE` with extracted metrics
//! - `postgres_database_size`, `postgres_slow_queries`, `postgres_locks`: diagnostics

pub mod args;
pub mod dispatcher;
pub mod format;

pub use args::ArgumentError;
pub use dispatcher::ToolDispatcher;

use serde::Serialize;
use serde_json::{Value as JsonValue, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    Echo,
    ConnectionTest,
    Query,
    Schema,
    TableInfo,
    QueryAnalyze,
    DatabaseSize,
    SlowQueries,
    Locks,
}

impl ToolName {
    /// Every tool, in `tools/list` order.
    pub const ALL: [ToolName; 9] = [
        ToolName::Echo,
        ToolName::ConnectionTest,
        ToolName::Query,
        ToolName::Schema,
        ToolName::TableInfo,
        ToolName::QueryAnalyze,
        ToolName::DatabaseSize,
        ToolName::SlowQueries,
        ToolName::Locks,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Echo => "echo",
            ToolName::ConnectionTest => "postgres_connection_test",
            ToolName::Query => "postgres_query",
            ToolName::Schema => "postgres_schema",
            ToolName::TableInfo => "postgres_table_info",
            ToolName::QueryAnalyze => "postgres_query_analyze",
            ToolName::DatabaseSize => "postgres_database_size",
            ToolName::SlowQueries => "postgres_slow_queries",
            ToolName::Locks => "postgres_locks",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn descriptor(self) -> ToolDescriptor {
        let (description, input_schema) = match self {
            ToolName::Echo => (
                "Echo back the input message",
                json!({
                    "type": "object",
                    "properties": {
                        "message": { "type": "string", "description": "Message to echo back" }
                    },
                    "required": ["message"]
                }),
            ),
            ToolName::ConnectionTest => (
                "Test the PostgreSQL connection and report server version, database and user",
                no_arguments(),
            ),
            ToolName::Query => (
                "Execute a SQL query against PostgreSQL. Parameters are bound positionally ($1, $2, ...)",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "SQL query to execute" },
                        "params": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Positional query parameters"
                        }
                    },
                    "required": ["query"]
                }),
            ),
            ToolName::Schema => (
                "List every user table with its columns",
                no_arguments(),
            ),
            ToolName::TableInfo => (
                "Describe a table: metadata, columns, indexes and row count",
                json!({
                    "type": "object",
                    "properties": {
                        "table_name": { "type": "string", "description": "Table name" },
                        "schema": {
                            "type": "string",
                            "description": "Schema name",
                            "default": "public"
                        }
                    },
                    "required": ["table_name"]
                }),
            ),
            ToolName::QueryAnalyze => (
                "Analyze query performance with EXPLAIN (ANALYZE, BUFFERS). The statement runs in a rolled back transaction",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "SQL query to analyze" }
                    },
                    "required": ["query"]
                }),
            ),
            ToolName::DatabaseSize => (
                "Report the database size and its largest tables",
                no_arguments(),
            ),
            ToolName::SlowQueries => (
                "List the slowest statements by mean execution time (requires pg_stat_statements)",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "integer",
                            "description": "Number of statements to return",
                            "default": 10,
                            "minimum": 1,
                            "maximum": 100
                        }
                    }
                }),
            ),
            ToolName::Locks => (
                "List locks held or awaited by other sessions",
                no_arguments(),
            ),
        };

        ToolDescriptor {
            name: self.as_str(),
            description,
            input_schema,
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn no_arguments() -> JsonValue {
    json!({ "type": "object", "properties": {} })
}

/// Entry returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonValue,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    ToolName::ALL.into_iter().map(ToolName::descriptor).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// `tools/call` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text.into(), false)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text.into(), true)
    }

    fn new(text: String, is_error: bool) -> Self {
        Self {
            content: vec![ToolContent { kind: "text", text }],
            is_error,
        }
    }

    /// Text of the first content block.
    pub fn first_text(&self) -> &str {
        self.content.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}
