//! Text rendering for tool results.
//!
//! Each tool answers with one text block: a short human-readable summary,
//! followed by the structured payload as pretty JSON where the summary does
//! not already carry every field.

use crate::models::{
    AnalysisResult, ConnectionStatus, DatabaseSizeReport, LockReport, PlanMetrics, QueryResult,
    SchemaReport, SlowQueryReport, TableInfo,
};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use std::fmt::Write;

/// Render a JSON cell for display.
pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Format bytes as a human-readable size (1 KiB = 1024 bytes).
pub fn format_size(bytes: i64) -> String {
    humansize::format_size(u64::try_from(bytes).unwrap_or(0), humansize::BINARY)
}

fn details<T: Serialize>(payload: &T) -> String {
    serde_json::to_string_pretty(payload)
        .unwrap_or_else(|e| format!("{{\"error\": \"unserializable result: {e}\"}}"))
}

fn field(row: &Map<String, JsonValue>, key: &str) -> String {
    row.get(key).map(format_value).unwrap_or_default()
}

pub fn echo(message: &str) -> String {
    format!("Echo: {message}")
}

/// Failure text: the message, then the `{success: false}` payload.
pub fn failure(message: &str) -> String {
    format!(
        "Error: {message}\n\n{}",
        details(&json!({ "success": false, "error": message }))
    )
}

pub fn connection(status: &ConnectionStatus, target: &str) -> String {
    let mut out = String::new();
    match status {
        ConnectionStatus::Connected {
            version,
            database,
            user,
            ..
        } => {
            let _ = writeln!(out, "Connected to PostgreSQL");
            let _ = writeln!(out, "Version: {version}");
            let _ = writeln!(out, "Database: {database}");
            let _ = writeln!(out, "User: {user}");
        }
        ConnectionStatus::Failed { error } => {
            let _ = writeln!(out, "Connection failed: {error}");
        }
    }
    let _ = writeln!(out, "Target: {target}");
    let _ = write!(out, "\n{}", details(status));
    out
}

/// Query result text and whether it reports a failure.
pub fn query(result: QueryResult) -> (String, bool) {
    let is_error = !result.is_success();
    let payload = result.into_json();
    let mut out = String::new();

    if is_error {
        let _ = writeln!(out, "Error: {}", field_str(&payload, "error"));
        let _ = writeln!(out, "Query: {}", field_str(&payload, "query"));
        let _ = write!(out, "\n{}", details(&payload));
        return (out, true);
    }

    match payload.get("data").and_then(JsonValue::as_array) {
        Some(rows) => {
            let _ = writeln!(
                out,
                "{} returned {} row(s)",
                field_str(&payload, "query_type"),
                rows.len()
            );
            let columns: Vec<String> = payload
                .get("columns")
                .and_then(JsonValue::as_array)
                .map(|cols| cols.iter().map(format_value).collect())
                .unwrap_or_default();
            let _ = writeln!(out, "Columns: {}", columns.join(", "));
            for (idx, row) in rows.iter().enumerate() {
                let _ = write!(out, "\nRow {}:", idx + 1);
                if let Some(cells) = row.as_object() {
                    for (name, value) in cells {
                        let _ = write!(out, "\n  {name}: {}", format_value(value));
                    }
                }
            }
        }
        None => {
            let _ = writeln!(out, "{}", field_str(&payload, "message"));
            let _ = write!(out, "Affected rows: {}", field_str(&payload, "affected_rows"));
        }
    }
    (out, false)
}

fn field_str(payload: &JsonValue, key: &str) -> String {
    payload.get(key).map(format_value).unwrap_or_default()
}

pub fn schema(report: &SchemaReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Database: {}", report.database);
    let _ = writeln!(
        out,
        "{} schema(s), {} table(s)",
        report.schema_count, report.table_count
    );

    let mut current_schema: Option<&str> = None;
    for table in report.tables() {
        if current_schema != Some(table.schema.as_str()) {
            let _ = writeln!(out, "\nSchema: {}", table.schema);
            current_schema = Some(table.schema.as_str());
        }
        let _ = writeln!(
            out,
            "  Table: {} (owner: {}, {} column(s))",
            table.table,
            table.owner,
            table.columns.len()
        );
        for column in &table.columns {
            let _ = writeln!(
                out,
                "    - {} {}{}",
                column.column_name,
                column.display_type(),
                if column.is_nullable() { "" } else { " NOT NULL" }
            );
        }
    }
    let _ = write!(out, "\n{}", details(report));
    out
}

pub fn table_info(info: &TableInfo) -> String {
    let meta = &info.table_info;
    let mut out = String::new();
    let _ = writeln!(out, "Table: {}.{}", meta.schemaname, meta.tablename);
    let _ = writeln!(out, "Owner: {}", meta.tableowner);
    let _ = writeln!(out, "Rows: {}", info.row_count);

    let _ = writeln!(out, "\nColumns:");
    for column in &info.columns {
        let _ = write!(
            out,
            "  - {} {}{}",
            column.column_name,
            column.display_type(),
            if column.is_nullable() { "" } else { " NOT NULL" }
        );
        if let Some(default) = &column.column_default {
            let _ = write!(out, " DEFAULT {default}");
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nIndexes:");
    if info.indexes.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for index in &info.indexes {
        let _ = writeln!(out, "  - {}: {}", index.indexname, index.indexdef);
    }

    let _ = write!(out, "\n{}", details(info));
    out
}

pub fn analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query: {}", result.query);

    match &result.analysis {
        PlanMetrics::Extracted(m) => {
            let _ = writeln!(out, "\nPerformance Metrics:");
            let _ = writeln!(out, "  Node Type: {}", m.node_type);
            let _ = writeln!(out, "  Total Cost: {}", m.total_cost);
            let _ = writeln!(out, "  Startup Cost: {}", m.startup_cost);
            let _ = writeln!(out, "  Actual Time: {} ms", m.actual_time);
            let _ = writeln!(out, "  Rows: {}", m.rows);
            let _ = writeln!(
                out,
                "  Shared Blocks: {} hit, {} read",
                m.shared_hit_blocks, m.shared_read_blocks
            );
            let _ = writeln!(
                out,
                "  Temp Blocks: {} read, {} written",
                m.temp_read_blocks, m.temp_written_blocks
            );
            if let Some(t) = m.planning_time {
                let _ = writeln!(out, "  Planning Time: {t} ms");
            }
            if let Some(t) = m.execution_time {
                let _ = writeln!(out, "  Execution Time: {t} ms");
            }
        }
        PlanMetrics::Unavailable { error } => {
            let _ = writeln!(out, "\nPerformance Metrics unavailable: {error}");
        }
    }

    let _ = write!(out, "\n{}", details(result));
    out
}

pub fn database_size(report: &DatabaseSizeReport) -> String {
    let db = &report.database;
    let mut out = String::new();
    let _ = writeln!(out, "Database: {}", db.database_name);
    let _ = writeln!(
        out,
        "Size: {} ({})",
        db.size_pretty,
        format_size(db.size_bytes)
    );

    let _ = writeln!(out, "\nLargest tables:");
    for (idx, table) in report.largest_tables.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {}.{}: {} (table {}, indexes {})",
            idx + 1,
            table.schemaname,
            table.tablename,
            format_size(table.total_bytes),
            table.table_size,
            table.indexes_size
        );
    }

    let _ = write!(out, "\n{}", details(report));
    out
}

pub fn slow_queries(report: &SlowQueryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Slow queries: {}", report.slow_queries.len());
    for (idx, row) in report.slow_queries.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n{}. mean {} ms, max {} ms, calls {}, rows {}",
            idx + 1,
            field(row, "mean_exec_time"),
            field(row, "max_exec_time"),
            field(row, "calls"),
            field(row, "rows")
        );
        let _ = writeln!(out, "   {}", field(row, "query"));
    }
    let _ = write!(out, "\n{}", details(report));
    out
}

pub fn locks(report: &LockReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Locks: {}", report.locks_count);
    for lock in &report.locks {
        let granted = lock.get("granted").and_then(JsonValue::as_bool).unwrap_or(false);
        let _ = writeln!(
            out,
            "  - pid {}: {} on {} ({})",
            field(lock, "pid"),
            field(lock, "mode"),
            field(lock, "locktype"),
            if granted { "granted" } else { "waiting" }
        );
    }
    let _ = write!(out, "\n{}", details(report));
    out
}
