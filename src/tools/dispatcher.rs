//! Tool dispatch.
//!
//! Resolves a tool name to a [`ToolName`], parses its arguments and calls the
//! matching [`PostgresService`] operation. Only an unknown tool name escapes
//! as a [`DispatchError`]; argument and backend failures become `isError`
//! results.

use crate::db::PostgresService;
use crate::error::DbError;
use crate::models::clamp_slow_query_limit;
use crate::rpc::DispatchError;
use crate::tools::args::{
    self, AnalyzeArgs, ArgumentError, EchoArgs, QueryArgs, SlowQueryArgs, TableInfoArgs,
};
use crate::tools::{ToolName, ToolOutput, format};
use serde_json::{Map, Value as JsonValue};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure inside a dispatched tool call.
#[derive(Error, Debug)]
enum ToolError {
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    #[error(transparent)]
    Backend(#[from] DbError),
}

#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    service: PostgresService,
}

impl ToolDispatcher {
    pub fn new(service: PostgresService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &PostgresService {
        &self.service
    }

    /// Run the named tool.
    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, JsonValue>,
    ) -> Result<ToolOutput, DispatchError> {
        let tool =
            ToolName::parse(name).ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let output = match self.run(tool, arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %tool, error = %e, "Tool call failed");
                ToolOutput::error(format::failure(&e.to_string()))
            }
        };
        debug!(
            tool = %tool,
            is_error = output.is_error,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Tool call completed"
        );
        Ok(output)
    }

    async fn run(
        &self,
        tool: ToolName,
        arguments: Map<String, JsonValue>,
    ) -> Result<ToolOutput, ToolError> {
        match tool {
            ToolName::Echo => {
                let args: EchoArgs = args::parse(tool, arguments)?;
                Ok(ToolOutput::text(format::echo(&args.message)))
            }
            ToolName::ConnectionTest => {
                let status = self.service.test_connection().await;
                let target = self
                    .service
                    .pools()
                    .database()
                    .redacted_connection_string();
                let text = format::connection(&status, &target);
                Ok(if status.is_connected() {
                    ToolOutput::text(text)
                } else {
                    ToolOutput::error(text)
                })
            }
            ToolName::Query => {
                let args: QueryArgs = args::parse(tool, arguments)?;
                let params = args.bind_values()?;
                let result = self.service.execute_query(&args.query, &params).await?;
                let (text, is_error) = format::query(result);
                Ok(if is_error {
                    ToolOutput::error(text)
                } else {
                    ToolOutput::text(text)
                })
            }
            ToolName::Schema => {
                let report = self.service.get_schema().await?;
                Ok(ToolOutput::text(format::schema(&report)))
            }
            ToolName::TableInfo => {
                let args: TableInfoArgs = args::parse(tool, arguments)?;
                args.validate()?;
                let info = self
                    .service
                    .get_table_info(&args.table_name, args.schema())
                    .await?;
                Ok(ToolOutput::text(format::table_info(&info)))
            }
            ToolName::QueryAnalyze => {
                let args: AnalyzeArgs = args::parse(tool, arguments)?;
                let result = self.service.analyze_query(&args.query).await?;
                Ok(ToolOutput::text(format::analysis(&result)))
            }
            ToolName::DatabaseSize => {
                let report = self.service.database_size().await?;
                Ok(ToolOutput::text(format::database_size(&report)))
            }
            ToolName::SlowQueries => {
                let args: SlowQueryArgs = args::parse(tool, arguments)?;
                let limit = clamp_slow_query_limit(args.limit);
                let report = self.service.slow_queries(limit).await?;
                Ok(ToolOutput::text(format::slow_queries(&report)))
            }
            ToolName::Locks => {
                let report = self.service.locks().await?;
                Ok(ToolOutput::text(format::locks(&report)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseSettings, PoolSettings};
    use serde_json::json;
    use std::time::Duration;

    fn dispatcher() -> ToolDispatcher {
        let db = DatabaseSettings::from_parts("127.0.0.1", 1, "u", "secret", "d").unwrap();
        let settings = PoolSettings {
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
            query_timeout: Duration::from_secs(1),
        };
        ToolDispatcher::new(PostgresService::new(db, settings))
    }

    fn args(value: JsonValue) -> Map<String, JsonValue> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_echo() {
        let out = dispatcher()
            .call("echo", args(json!({"message": "hi"})))
            .await
            .unwrap();
        assert_eq!(out, ToolOutput::text("Echo: hi"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = dispatcher().call("nope", Map::new()).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTool(ref name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_empty_query_never_connects() {
        let dispatcher = dispatcher();
        let out = dispatcher
            .call("postgres_query", args(json!({"query": "   "})))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.first_text().contains("Query cannot be empty"));
        assert_eq!(dispatcher.service().pools().init_attempts(), 0);
    }

    #[tokio::test]
    async fn test_missing_table_name_is_tool_error() {
        let out = dispatcher()
            .call("postgres_table_info", Map::new())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.first_text().contains("table_name"));
    }

    #[tokio::test]
    async fn test_connection_test_failure_redacts_password() {
        let out = dispatcher()
            .call("postgres_connection_test", Map::new())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.first_text().contains("Connection failed"));
        assert!(!out.first_text().contains("secret"));
    }

    #[tokio::test]
    async fn test_backend_failure_is_tool_error() {
        let out = dispatcher()
            .call("postgres_schema", Map::new())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.first_text().contains("\"success\": false"));
    }
}
