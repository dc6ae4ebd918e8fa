//! Schema introspection module.
//!
//! Builds [`SchemaReport`]s and [`TableInfo`]s from catalog queries. The schema
//! report is fetched in two phases (tables, then columns per table) so every
//! query stays small. Any failing catalog query fails the whole report.
//!
//! `information_schema` exposes domain types (`sql_identifier`,
//! `cardinal_number`, ...); the queries cast them to base types for decoding.

use crate::db::pool::PoolManager;
use crate::error::{DbError, DbResult};
use crate::models::{
    ColumnDescriptor, IndexDescriptor, SchemaReport, TableDescriptor, TableInfo, TableMetadata,
};
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::sync::Arc;
use tracing::debug;

/// Schema used when a caller does not name one.
pub const DEFAULT_SCHEMA: &str = "public";

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub const LIST_TABLES: &str = r#"
        SELECT
            schemaname::text AS schemaname,
            tablename::text AS tablename,
            tableowner::text AS tableowner
        FROM pg_tables
        WHERE schemaname NOT IN ('information_schema', 'pg_catalog')
        ORDER BY schemaname, tablename
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable,
            column_default::text AS column_default,
            character_maximum_length::int4 AS character_maximum_length
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
        "#;

    pub const TABLE_METADATA: &str = r#"
        SELECT
            schemaname::text AS schemaname,
            tablename::text AS tablename,
            tableowner::text AS tableowner,
            tablespace::text AS tablespace,
            hasindexes,
            hasrules,
            hastriggers
        FROM pg_tables
        WHERE schemaname = $1 AND tablename = $2
        "#;

    pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            column_name::text AS column_name,
            data_type::text AS data_type,
            is_nullable::text AS is_nullable,
            column_default::text AS column_default,
            character_maximum_length::int4 AS character_maximum_length,
            numeric_precision::int4 AS numeric_precision,
            numeric_scale::int4 AS numeric_scale
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
        "#;

    pub const LIST_INDEXES: &str = r#"
        SELECT
            indexname::text AS indexname,
            indexdef
        FROM pg_indexes
        WHERE schemaname = $1 AND tablename = $2
        ORDER BY indexname
        "#;
}

/// Quote an identifier for interpolation into SQL text.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Catalog-backed schema inspector.
#[derive(Debug, Clone)]
pub struct SchemaInspector {
    pools: Arc<PoolManager>,
}

impl SchemaInspector {
    pub fn new(pools: Arc<PoolManager>) -> Self {
        Self { pools }
    }

    /// Every user table with its ordered columns.
    pub async fn get_schema(&self) -> DbResult<SchemaReport> {
        let pool = self.pools.pool().await?;
        let table_rows = self
            .pools
            .bounded(
                "schema listing",
                sqlx::query(queries::LIST_TABLES).fetch_all(pool),
            )
            .await?;

        let mut tables = Vec::with_capacity(table_rows.len());
        for row in &table_rows {
            let schema: String = row.try_get("schemaname")?;
            let table: String = row.try_get("tablename")?;
            let owner: String = row.try_get("tableowner")?;

            let column_rows = self
                .pools
                .bounded(
                    "column listing",
                    sqlx::query(queries::LIST_COLUMNS)
                        .bind(&schema)
                        .bind(&table)
                        .fetch_all(pool),
                )
                .await?;
            let columns = column_rows
                .iter()
                .map(column_from_row)
                .collect::<DbResult<Vec<_>>>()?;

            tables.push(TableDescriptor {
                schema,
                table,
                owner,
                columns,
            });
        }

        let report = SchemaReport::new(self.pools.database().database(), tables);
        debug!(
            schemas = report.schema_count,
            tables = report.table_count,
            "Loaded database schema"
        );
        Ok(report)
    }

    /// Metadata, columns, indexes and live row count for one table.
    ///
    /// Returns [`DbError::TableNotFound`] before running the remaining queries
    /// when the table does not exist.
    pub async fn get_table_info(&self, table: &str, schema: &str) -> DbResult<TableInfo> {
        let pool = self.pools.pool().await?;

        let metadata_row = self
            .pools
            .bounded(
                "table lookup",
                sqlx::query(queries::TABLE_METADATA)
                    .bind(schema)
                    .bind(table)
                    .fetch_optional(pool),
            )
            .await?
            .ok_or_else(|| DbError::table_not_found(schema, table))?;
        let table_info = TableMetadata {
            schemaname: metadata_row.try_get("schemaname")?,
            tablename: metadata_row.try_get("tablename")?,
            tableowner: metadata_row.try_get("tableowner")?,
            tablespace: metadata_row.try_get("tablespace")?,
            hasindexes: metadata_row.try_get("hasindexes")?,
            hasrules: metadata_row.try_get("hasrules")?,
            hastriggers: metadata_row.try_get("hastriggers")?,
        };

        let column_rows = self
            .pools
            .bounded(
                "column listing",
                sqlx::query(queries::DESCRIBE_COLUMNS)
                    .bind(schema)
                    .bind(table)
                    .fetch_all(pool),
            )
            .await?;
        let columns = column_rows
            .iter()
            .map(|row| -> DbResult<ColumnDescriptor> {
                let mut column = column_from_row(row)?;
                column.numeric_precision = row.try_get("numeric_precision")?;
                column.numeric_scale = row.try_get("numeric_scale")?;
                Ok(column)
            })
            .collect::<DbResult<Vec<_>>>()?;

        let index_rows = self
            .pools
            .bounded(
                "index listing",
                sqlx::query(queries::LIST_INDEXES)
                    .bind(schema)
                    .bind(table)
                    .fetch_all(pool),
            )
            .await?;
        let indexes = index_rows
            .iter()
            .map(|row| -> DbResult<IndexDescriptor> {
                Ok(IndexDescriptor {
                    indexname: row.try_get("indexname")?,
                    indexdef: row.try_get("indexdef")?,
                })
            })
            .collect::<DbResult<Vec<_>>>()?;

        let count_sql = format!(
            "SELECT COUNT(*) AS row_count FROM {}.{}",
            quote_ident(schema),
            quote_ident(table)
        );
        let row_count: i64 = self
            .pools
            .bounded(
                "row count",
                sqlx::query_scalar(&count_sql).fetch_one(pool),
            )
            .await?;

        debug!(
            schema,
            table,
            columns = columns.len(),
            indexes = indexes.len(),
            row_count,
            "Loaded table info"
        );

        Ok(TableInfo {
            table_info,
            columns,
            indexes,
            row_count,
        })
    }
}

fn column_from_row(row: &PgRow) -> DbResult<ColumnDescriptor> {
    Ok(ColumnDescriptor {
        column_name: row.try_get("column_name")?,
        data_type: row.try_get("data_type")?,
        is_nullable: row.try_get("is_nullable")?,
        column_default: row.try_get("column_default")?,
        character_maximum_length: row.try_get("character_maximum_length")?,
        numeric_precision: None,
        numeric_scale: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("Mixed Case"), "\"Mixed Case\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_column_queries_cast_domain_types() {
        assert!(queries::LIST_COLUMNS.contains("column_name::text"));
        assert!(queries::DESCRIBE_COLUMNS.contains("numeric_scale::int4"));
    }
}
