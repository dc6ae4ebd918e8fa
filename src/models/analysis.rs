//! Execution plan analysis models.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// Scalar metrics taken from the root plan node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_cost: f64,
    pub startup_cost: f64,
    /// Milliseconds spent in the root node.
    pub actual_time: f64,
    pub rows: f64,
    pub node_type: String,
    pub shared_hit_blocks: i64,
    pub shared_read_blocks: i64,
    pub temp_read_blocks: i64,
    pub temp_written_blocks: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
}

/// Metrics, or the reason they could not be read from the plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PlanMetrics {
    Extracted(PerformanceMetrics),
    Unavailable { error: String },
}

impl PlanMetrics {
    pub fn metrics(&self) -> Option<&PerformanceMetrics> {
        match self {
            Self::Extracted(m) => Some(m),
            Self::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub query: String,
    /// Raw `EXPLAIN (FORMAT JSON)` output.
    pub execution_plan: JsonValue,
    pub analysis: PlanMetrics,
}
