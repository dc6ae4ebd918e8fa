//! Query-related data models.
//!
//! This module defines statement classification and the result types produced by
//! the query executor.

use crate::models::value::{CellRow, row_into_json};
use serde_json::{Value as JsonValue, json};

/// Sentinel reported when the affected-row count cannot be read from a status tag.
pub const AFFECTED_ROWS_UNKNOWN: i64 = -1;

/// Leading keywords whose statements produce a row set.
const ROW_RETURNING_KEYWORDS: &[&str] = &["SELECT", "WITH", "VALUES", "TABLE", "SHOW", "EXPLAIN"];

/// Commands whose status tag carries a row count.
const COUNTED_COMMANDS: &[&str] = &["INSERT", "UPDATE", "DELETE", "MERGE", "COPY", "FETCH", "MOVE"];

/// Statement class, decided by the first keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// Row-returning statement. Holds the uppercased keyword.
    Select(String),
    /// Anything else (DML, DDL, utility). Holds the uppercased keyword.
    Other(String),
}

impl StatementKind {
    /// Classify SQL by its first keyword, ignoring case and leading comments.
    pub fn classify(sql: &str) -> Self {
        let keyword = first_keyword(sql).to_ascii_uppercase();
        if ROW_RETURNING_KEYWORDS.contains(&keyword.as_str()) {
            Self::Select(keyword)
        } else {
            Self::Other(keyword)
        }
    }

    pub fn keyword(&self) -> &str {
        match self {
            Self::Select(k) | Self::Other(k) => k,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select(_))
    }
}

/// Skip leading whitespace, `--` line comments and `/* */` block comments.
fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(pos) => after[pos + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(pos) => after[pos + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

fn leading_word(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

fn first_keyword(sql: &str) -> &str {
    leading_word(strip_leading_comments(sql))
}

/// Build the status tag PostgreSQL reports for a completed command.
///
/// INSERT tags carry the legacy OID field (`INSERT 0 n`). Commands without a row
/// count report their keyword plus object type, e.g. `CREATE TABLE`.
pub fn command_tag(sql: &str, rows_affected: u64) -> String {
    let body = strip_leading_comments(sql);
    let keyword = leading_word(body).to_ascii_uppercase();
    if keyword == "INSERT" {
        return format!("INSERT 0 {rows_affected}");
    }
    if COUNTED_COMMANDS.contains(&keyword.as_str()) {
        return format!("{keyword} {rows_affected}");
    }
    let object = body[keyword.len()..]
        .split_whitespace()
        .next()
        .filter(|w| w.chars().all(|c| c.is_ascii_alphabetic()));
    match object {
        Some(object) => format!("{keyword} {}", object.to_ascii_uppercase()),
        None => keyword,
    }
}

/// Read the affected-row count from the last token of a status tag.
pub fn parse_affected_rows(tag: &str) -> i64 {
    tag.split_whitespace()
        .last()
        .and_then(|token| token.parse::<i64>().ok())
        .unwrap_or(AFFECTED_ROWS_UNKNOWN)
}

/// Rows returned by a row-producing statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectResult {
    pub query_type: String,
    /// Column names from the first row. Empty when no rows came back.
    pub columns: Vec<String>,
    pub rows: Vec<CellRow>,
}

impl SelectResult {
    pub fn new(query_type: impl Into<String>, rows: Vec<CellRow>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default();
        Self {
            query_type: query_type.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Outcome of a statement that does not return rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationResult {
    pub query_type: String,
    /// Server status tag, e.g. `UPDATE 3`.
    pub status: String,
    /// Parsed from `status`; [`AFFECTED_ROWS_UNKNOWN`] when absent.
    pub affected_rows: i64,
}

impl MutationResult {
    pub fn new(query_type: impl Into<String>, status: impl Into<String>) -> Self {
        let status = status.into();
        let affected_rows = parse_affected_rows(&status);
        Self {
            query_type: query_type.into(),
            status,
            affected_rows,
        }
    }

    pub fn message(&self) -> String {
        format!("Query executed successfully: {}", self.status)
    }
}

/// Failed execution. Carries the original SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub error: String,
    pub query: String,
}

/// Result of running one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Select(SelectResult),
    Mutation(MutationResult),
    Failed(QueryFailure),
}

impl QueryResult {
    pub fn failed(error: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Failed(QueryFailure {
            error: error.into(),
            query: query.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Convert to the transport JSON payload. Cell values are rendered here.
    pub fn into_json(self) -> JsonValue {
        match self {
            Self::Select(select) => {
                let row_count = select.row_count();
                let data: Vec<JsonValue> = select
                    .rows
                    .into_iter()
                    .map(|row| JsonValue::Object(row_into_json(row)))
                    .collect();
                json!({
                    "success": true,
                    "query_type": select.query_type,
                    "row_count": row_count,
                    "data": data,
                    "columns": select.columns,
                })
            }
            Self::Mutation(mutation) => json!({
                "success": true,
                "query_type": mutation.query_type,
                "affected_rows": mutation.affected_rows,
                "message": mutation.message(),
            }),
            Self::Failed(failure) => json!({
                "success": false,
                "error": failure.error,
                "query": failure.query,
            }),
        }
    }
}
