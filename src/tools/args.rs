//! Tool argument parsing.
//!
//! Argument problems are tool-level failures (`isError: true`), not RPC
//! errors: the call itself was dispatched.

use crate::db::{DEFAULT_SCHEMA, QueryParam};
use crate::tools::ToolName;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("Invalid arguments for {tool}: {reason}")]
    Malformed { tool: ToolName, reason: String },

    #[error("{0} cannot be empty")]
    Empty(&'static str),

    #[error("params[{index}] must be a string, number, boolean or null")]
    UnsupportedParam { index: usize },
}

/// Deserialize a tool's `arguments` object.
pub fn parse<T: DeserializeOwned>(
    tool: ToolName,
    arguments: Map<String, JsonValue>,
) -> Result<T, ArgumentError> {
    serde_json::from_value(JsonValue::Object(arguments)).map_err(|e| ArgumentError::Malformed {
        tool,
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct EchoArgs {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryArgs {
    pub query: String,
    #[serde(default)]
    pub params: Option<Vec<JsonValue>>,
}

impl QueryArgs {
    /// Parameters as bind values.
    ///
    /// Strings bind as text; numbers and booleans bind as their text form and
    /// rely on the server's parameter type inference; `null` binds NULL.
    pub fn bind_values(&self) -> Result<Vec<QueryParam>, ArgumentError> {
        self.params
            .iter()
            .flatten()
            .enumerate()
            .map(|(index, value)| match value {
                JsonValue::Null => Ok(None),
                JsonValue::String(s) => Ok(Some(s.clone())),
                JsonValue::Number(n) => Ok(Some(n.to_string())),
                JsonValue::Bool(b) => Ok(Some(b.to_string())),
                JsonValue::Array(_) | JsonValue::Object(_) => {
                    Err(ArgumentError::UnsupportedParam { index })
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableInfoArgs {
    pub table_name: String,
    #[serde(default)]
    pub schema: Option<String>,
}

impl TableInfoArgs {
    pub fn schema(&self) -> &str {
        self.schema
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SCHEMA)
    }

    pub fn validate(&self) -> Result<(), ArgumentError> {
        if self.table_name.trim().is_empty() {
            return Err(ArgumentError::Empty("table_name"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeArgs {
    pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlowQueryArgs {
    #[serde(default)]
    pub limit: Option<i64>,
}
