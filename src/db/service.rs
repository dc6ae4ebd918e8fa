//! PostgreSQL service facade.
//!
//! [`PostgresService`] owns the shared [`PoolManager`] and hands the same pool
//! handle to every component. Tool handlers only talk to this type.

use crate::config::{DatabaseSettings, PoolSettings};
use crate::db::analyzer::PerformanceAnalyzer;
use crate::db::diagnostics::Diagnostics;
use crate::db::executor::{QueryExecutor, QueryParam};
use crate::db::pool::PoolManager;
use crate::db::schema::SchemaInspector;
use crate::error::DbResult;
use crate::models::{
    AnalysisResult, ConnectionStatus, DatabaseSizeReport, LockReport, QueryResult, SchemaReport,
    SlowQueryReport, TableInfo,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PostgresService {
    pools: Arc<PoolManager>,
    executor: QueryExecutor,
    inspector: SchemaInspector,
    analyzer: PerformanceAnalyzer,
    diagnostics: Diagnostics,
}

impl PostgresService {
    pub fn new(database: DatabaseSettings, settings: PoolSettings) -> Self {
        Self::with_pool_manager(Arc::new(PoolManager::new(database, settings)))
    }

    pub fn with_pool_manager(pools: Arc<PoolManager>) -> Self {
        Self {
            executor: QueryExecutor::new(pools.clone()),
            inspector: SchemaInspector::new(pools.clone()),
            analyzer: PerformanceAnalyzer::new(pools.clone()),
            diagnostics: Diagnostics::new(pools.clone()),
            pools,
        }
    }

    pub fn pools(&self) -> &Arc<PoolManager> {
        &self.pools
    }

    pub async fn ensure_ready(&self) -> DbResult<()> {
        self.pools.ensure_ready().await
    }

    pub async fn test_connection(&self) -> ConnectionStatus {
        self.pools.test_connection().await
    }

    pub async fn execute_query(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        self.executor.execute(sql, params).await
    }

    pub async fn get_schema(&self) -> DbResult<SchemaReport> {
        self.inspector.get_schema().await
    }

    pub async fn get_table_info(&self, table: &str, schema: &str) -> DbResult<TableInfo> {
        self.inspector.get_table_info(table, schema).await
    }

    pub async fn analyze_query(&self, sql: &str) -> DbResult<AnalysisResult> {
        self.analyzer.analyze(sql).await
    }

    pub async fn database_size(&self) -> DbResult<DatabaseSizeReport> {
        self.diagnostics.database_size().await
    }

    pub async fn slow_queries(&self, limit: u32) -> DbResult<SlowQueryReport> {
        self.diagnostics.slow_queries(limit).await
    }

    pub async fn locks(&self) -> DbResult<LockReport> {
        self.diagnostics.locks().await
    }

    /// Close the pool at process shutdown.
    pub async fn close(&self) {
        self.pools.close().await;
    }
}
