//! Execution plan analysis.
//!
//! Runs `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` and pulls scalar metrics out of
//! the root plan node. `ANALYZE` really executes the statement, so the explain
//! runs inside a transaction that is always rolled back.

use crate::db::executor::EMPTY_QUERY_MESSAGE;
use crate::db::pool::PoolManager;
use crate::error::{DbError, DbResult};
use crate::models::{AnalysisResult, PerformanceMetrics, PlanMetrics};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Node type reported when the plan omits one.
const UNKNOWN_NODE_TYPE: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    pools: Arc<PoolManager>,
}

impl PerformanceAnalyzer {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// Explain `sql` with real timing and buffer statistics.
    ///
    /// A plan whose shape cannot be read still returns `Ok`, with
    /// [`PlanMetrics::Unavailable`] next to the raw plan.
    pub async fn analyze(&self, sql: &str) -> DbResult<AnalysisResult> {
        if sql.trim().is_empty() {
            return Err(DbError::invalid_input(EMPTY_QUERY_MESSAGE));
        }

        let plan = self.explain(sql).await.inspect_err(|e| {
            error!(error = %e, "Query analysis failed");
        })?;

        let analysis = match extract_metrics(&plan) {
            Ok(metrics) => {
                debug!(
                    node_type = %metrics.node_type,
                    total_cost = metrics.total_cost,
                    actual_time = metrics.actual_time,
                    "Query analyzed"
                );
                PlanMetrics::Extracted(metrics)
            }
            Err(reason) => {
                warn!(error = %reason, "Failed to extract performance metrics");
                PlanMetrics::Unavailable { error: reason }
            }
        };

        Ok(AnalysisResult {
            query: sql.to_string(),
            execution_plan: plan,
            analysis,
        })
    }

    async fn explain(&self, sql: &str) -> DbResult<JsonValue> {
        let pool = self.pools.pool().await?;
        let explain_sql = format!("EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) {}", sql);

        let mut tx = self.pools.bounded("begin analysis", pool.begin()).await?;
        // Dropping `tx` on the error path rolls back as well.
        let plan: JsonValue = self
            .pools
            .bounded(
                "query analysis",
                sqlx::query_scalar(&explain_sql).fetch_one(&mut *tx),
            )
            .await?;
        self.pools
            .bounded("rollback analysis", tx.rollback())
            .await?;

        Ok(plan)
    }
}

/// Read the fixed metric set from an `EXPLAIN (FORMAT JSON)` document.
///
/// Missing numeric fields default to zero; a document without a root `Plan`
/// object is an error.
pub fn extract_metrics(plan: &JsonValue) -> Result<PerformanceMetrics, String> {
    let top = plan
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| "execution plan is not a non-empty array".to_string())?;
    let root = top
        .get("Plan")
        .filter(|p| p.is_object())
        .ok_or_else(|| "execution plan has no root Plan node".to_string())?;

    let float = |key: &str| root.get(key).and_then(JsonValue::as_f64).unwrap_or(0.0);
    let blocks = |key: &str| root.get(key).and_then(JsonValue::as_i64).unwrap_or(0);

    Ok(PerformanceMetrics {
        total_cost: float("Total Cost"),
        startup_cost: float("Startup Cost"),
        actual_time: float("Actual Total Time"),
        rows: float("Actual Rows"),
        node_type: root
            .get("Node Type")
            .and_then(JsonValue::as_str)
            .unwrap_or(UNKNOWN_NODE_TYPE)
            .to_string(),
        shared_hit_blocks: blocks("Shared Hit Blocks"),
        shared_read_blocks: blocks("Shared Read Blocks"),
        temp_read_blocks: blocks("Temp Read Blocks"),
        temp_written_blocks: blocks("Temp Written Blocks"),
        planning_time: top.get("Planning Time").and_then(JsonValue::as_f64),
        execution_time: top.get("Execution Time").and_then(JsonValue::as_f64),
    })
}
