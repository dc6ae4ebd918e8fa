//! Query execution engine.
//!
//! Runs caller SQL against the shared pool. Statements are classified by their
//! first keyword: row-returning statements are collected eagerly into
//! [`SelectResult`]s, everything else reports a status tag.
//!
//! Without parameters the SQL goes over the simple query protocol, which accepts
//! multi-statement text and utility commands that cannot be prepared. With
//! parameters it is prepared and every parameter is bound, never interpolated.

use crate::db::pool::PoolManager;
use crate::db::types::RowToCells;
use crate::error::{DbError, DbResult};
use crate::models::{
    CellRow, MutationResult, QueryResult, SelectResult, StatementKind, command_tag,
};
use futures_util::TryStreamExt;
use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Message returned for empty or whitespace-only SQL.
pub const EMPTY_QUERY_MESSAGE: &str = "Query cannot be empty";

/// A positional parameter. `None` binds SQL NULL.
pub type QueryParam = Option<String>;

/// Query executor bound to the shared pool.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    pools: Arc<PoolManager>,
}

impl QueryExecutor {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// Execute one statement.
    ///
    /// Only input validation fails the call. Connection and SQL errors come back
    /// as [`QueryResult::Failed`] carrying the original SQL.
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        if sql.trim().is_empty() {
            return Err(DbError::invalid_input(EMPTY_QUERY_MESSAGE));
        }

        let start = Instant::now();
        let kind = StatementKind::classify(sql);
        debug!(
            query_type = kind.keyword(),
            params = params.len(),
            "Executing query"
        );

        let outcome = match &kind {
            StatementKind::Select(keyword) => self
                .fetch_rows(sql, params)
                .await
                .map(|rows| QueryResult::Select(SelectResult::new(keyword.as_str(), rows))),
            StatementKind::Other(keyword) => self
                .execute_statement(sql, params)
                .await
                .map(|affected| {
                    QueryResult::Mutation(MutationResult::new(
                        keyword.as_str(),
                        command_tag(sql, affected),
                    ))
                }),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(result) => {
                debug!(query_type = kind.keyword(), elapsed_ms, "Query completed");
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, query_type = kind.keyword(), elapsed_ms, "Query execution failed");
                Ok(QueryResult::failed(e.to_string(), sql))
            }
        }
    }

    /// Fetch every row of a statement as native cells.
    pub async fn fetch_rows(&self, sql: &str, params: &[QueryParam]) -> DbResult<Vec<CellRow>> {
        let pool = self.pools.pool().await?;
        let stream = if params.is_empty() {
            use sqlx::Executor;
            pool.fetch(sql)
        } else {
            bind_params(sqlx::query(sql), params).fetch(pool)
        };

        let rows = self
            .pools
            .bounded("query execution", stream.try_collect::<Vec<_>>())
            .await?;
        Ok(rows.iter().map(RowToCells::to_cells).collect())
    }

    /// Execute a statement and return the affected-row count.
    async fn execute_statement(&self, sql: &str, params: &[QueryParam]) -> DbResult<u64> {
        let pool = self.pools.pool().await?;
        let result = if params.is_empty() {
            use sqlx::Executor;
            self.pools.bounded("statement execution", pool.execute(sql)).await?
        } else {
            self.pools
                .bounded(
                    "statement execution",
                    bind_params(sqlx::query(sql), params).execute(pool),
                )
                .await?
        };
        Ok(result.rows_affected())
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [QueryParam],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = query.bind(param.as_deref());
    }
    query
}
