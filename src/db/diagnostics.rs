//! Server diagnostics: database size, slow statements and locks.

use crate::db::pool::PoolManager;
use crate::db::types::RowToCells;
use crate::error::{DbError, DbResult};
use crate::models::{
    DatabaseSize, DatabaseSizeReport, LockReport, SlowQueryReport, TableSize, row_into_json,
};
use serde_json::{Map, Value as JsonValue};
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::sync::Arc;
use tracing::{debug, error};

/// Failure reported when `pg_stat_statements` is not installed.
pub const MISSING_STAT_STATEMENTS: &str = "pg_stat_statements extension not available";

mod queries {
    pub const DATABASE_SIZE: &str = r#"
        SELECT
            datname::text AS database_name,
            pg_size_pretty(pg_database_size(datname)) AS size_pretty,
            pg_database_size(datname) AS size_bytes
        FROM pg_database
        WHERE datname = current_database()
        "#;

    pub const LARGEST_TABLES: &str = r#"
        WITH rel AS (
            SELECT
                schemaname::text AS schemaname,
                tablename::text AS tablename,
                format('%I.%I', schemaname, tablename)::regclass AS oid
            FROM pg_tables
            WHERE schemaname NOT IN ('information_schema', 'pg_catalog')
        )
        SELECT
            schemaname,
            tablename,
            pg_size_pretty(pg_total_relation_size(oid)) AS total_size,
            pg_size_pretty(pg_relation_size(oid)) AS table_size,
            pg_size_pretty(pg_indexes_size(oid)) AS indexes_size,
            pg_total_relation_size(oid) AS total_bytes
        FROM rel
        ORDER BY total_bytes DESC
        LIMIT 10
        "#;

    pub const HAS_STAT_STATEMENTS: &str =
        "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'pg_stat_statements')";

    pub const LOCKS: &str = r#"
        SELECT
            pg_locks.locktype,
            pg_locks.database,
            pg_locks.relation,
            pg_locks.page,
            pg_locks.tuple,
            pg_locks.classid,
            pg_locks.objid,
            pg_locks.objsubid,
            pg_locks.pid,
            pg_locks.mode,
            pg_locks.granted,
            pg_stat_activity.usename::text AS usename,
            pg_stat_activity.query,
            pg_stat_activity.query_start
        FROM pg_locks
        JOIN pg_stat_activity ON pg_locks.pid = pg_stat_activity.pid
        WHERE pg_stat_activity.pid != pg_backend_pid()
        ORDER BY pg_locks.granted, pg_locks.pid
        "#;

    /// LIMIT is formatted in from a clamped integer.
    pub fn slow_queries(limit: u32) -> String {
        format!(
            r#"
        SELECT
            query,
            calls,
            total_exec_time,
            mean_exec_time,
            max_exec_time,
            stddev_exec_time,
            rows,
            100.0 * shared_blks_hit / nullif(shared_blks_hit + shared_blks_read, 0) AS hit_percent
        FROM pg_stat_statements
        ORDER BY mean_exec_time DESC
        LIMIT {limit}
        "#
        )
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pools: Arc<PoolManager>,
}

impl Diagnostics {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// Current database size and its ten largest user tables.
    pub async fn database_size(&self) -> DbResult<DatabaseSizeReport> {
        let pool = self.pools.pool().await?;

        let row = self
            .pools
            .bounded(
                "database size",
                sqlx::query(queries::DATABASE_SIZE).fetch_one(pool),
            )
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read database size"))?;
        let database = DatabaseSize {
            database_name: row.try_get("database_name")?,
            size_pretty: row.try_get("size_pretty")?,
            size_bytes: row.try_get("size_bytes")?,
        };

        let largest_tables = self
            .pools
            .bounded(
                "table sizes",
                sqlx::query(queries::LARGEST_TABLES).fetch_all(pool),
            )
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read table sizes"))?
            .iter()
            .map(table_size_from_row)
            .collect::<DbResult<Vec<_>>>()?;

        debug!(
            database = %database.database_name,
            size_bytes = database.size_bytes,
            tables = largest_tables.len(),
            "Loaded database size"
        );
        Ok(DatabaseSizeReport {
            database,
            largest_tables,
        })
    }

    /// Slowest statements by mean execution time.
    ///
    /// `limit` must already be clamped by the caller.
    pub async fn slow_queries(&self, limit: u32) -> DbResult<SlowQueryReport> {
        let pool = self.pools.pool().await?;

        let available: bool = self
            .pools
            .bounded(
                "extension check",
                sqlx::query_scalar(queries::HAS_STAT_STATEMENTS).fetch_one(pool),
            )
            .await?;
        if !available {
            return Err(DbError::invalid_input(MISSING_STAT_STATEMENTS));
        }

        let sql = queries::slow_queries(limit);
        let rows = self
            .pools
            .bounded("slow query listing", sqlx::query(&sql).fetch_all(pool))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read slow queries"))?;

        Ok(SlowQueryReport {
            slow_queries: rows_into_maps(&rows),
        })
    }

    /// Locks held or awaited by other backends.
    pub async fn locks(&self) -> DbResult<LockReport> {
        let pool = self.pools.pool().await?;
        let rows = self
            .pools
            .bounded("lock listing", sqlx::query(queries::LOCKS).fetch_all(pool))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read locks"))?;

        Ok(LockReport::new(rows_into_maps(&rows)))
    }
}

fn table_size_from_row(row: &PgRow) -> DbResult<TableSize> {
    Ok(TableSize {
        schemaname: row.try_get("schemaname")?,
        tablename: row.try_get("tablename")?,
        total_size: row.try_get("total_size")?,
        table_size: row.try_get("table_size")?,
        indexes_size: row.try_get("indexes_size")?,
        total_bytes: row.try_get("total_bytes")?,
    })
}

fn rows_into_maps(rows: &[PgRow]) -> Vec<Map<String, JsonValue>> {
    rows.iter().map(|row| row_into_json(row.to_cells())).collect()
}
