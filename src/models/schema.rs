//! Schema-related data models.
//!
//! This module defines the reports produced by catalog introspection.

use serde::{Serialize, Serializer};

/// One column as described by `information_schema.columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub data_type: String,
    /// `YES` or `NO`, as the catalog reports it.
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub character_maximum_length: Option<i32>,
    /// Only fetched for table detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_precision: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_scale: Option<i32>,
}

impl ColumnDescriptor {
    pub fn new(
        column_name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            data_type: data_type.into(),
            is_nullable: if nullable { "YES" } else { "NO" }.to_string(),
            column_default: None,
            character_maximum_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.is_nullable.eq_ignore_ascii_case("YES")
    }

    /// Declared type with length or precision when the catalog reports one,
    /// e.g. `character varying(50)` or `numeric(10,2)`.
    pub fn display_type(&self) -> String {
        match (
            self.character_maximum_length,
            self.numeric_precision,
            self.numeric_scale,
        ) {
            (Some(len), _, _) => format!("{}({})", self.data_type, len),
            (None, Some(p), Some(s)) if self.data_type == "numeric" => {
                format!("{}({},{})", self.data_type, p, s)
            }
            _ => self.data_type.clone(),
        }
    }
}

/// A user table with its ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub schema: String,
    pub table: String,
    pub owner: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Tables keyed by qualified name, in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaTables {
    #[serde(serialize_with = "serialize_tables")]
    pub tables: Vec<TableDescriptor>,
}

fn serialize_tables<S: Serializer>(tables: &[TableDescriptor], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(tables.iter().map(|t| (t.qualified_name(), t)))
}

/// Every user table in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub database: String,
    pub schema_count: usize,
    pub table_count: usize,
    pub schema: SchemaTables,
}

impl SchemaReport {
    pub fn new(database: impl Into<String>, tables: Vec<TableDescriptor>) -> Self {
        let mut schemas: Vec<&str> = tables.iter().map(|t| t.schema.as_str()).collect();
        schemas.sort_unstable();
        schemas.dedup();
        Self {
            database: database.into(),
            schema_count: schemas.len(),
            table_count: tables.len(),
            schema: SchemaTables { tables },
        }
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.schema.tables
    }
}

/// Row from `pg_tables` for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub schemaname: String,
    pub tablename: String,
    pub tableowner: String,
    pub tablespace: Option<String>,
    pub hasindexes: bool,
    pub hasrules: bool,
    pub hastriggers: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDescriptor {
    pub indexname: String,
    pub indexdef: String,
}

/// Detailed description of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub table_info: TableMetadata,
    pub columns: Vec<ColumnDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
    pub row_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(schema: &str, name: &str) -> TableDescriptor {
        TableDescriptor {
            schema: schema.to_string(),
            table: name.to_string(),
            owner: "postgres".to_string(),
            columns: vec![ColumnDescriptor::new("id", "integer", false)],
        }
    }

    #[test]
    fn test_schema_report_counts() {
        let report = SchemaReport::new(
            "app",
            vec![
                table("public", "users"),
                table("public", "orders"),
                table("sales", "leads"),
            ],
        );
        assert_eq!(report.schema_count, 2);
        assert_eq!(report.table_count, 3);
    }

    #[test]
    fn test_schema_report_keys_in_catalog_order() {
        let report = SchemaReport::new("app", vec![table("b", "z"), table("a", "y")]);
        let json = serde_json::to_value(&report).unwrap();
        let keys: Vec<&String> = json["schema"]["tables"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, vec!["b.z", "a.y"]);
        assert_eq!(json["schema"]["tables"]["b.z"]["owner"], "postgres");
    }

    #[test]
    fn test_column_detail_fields_skipped_when_absent() {
        let json = serde_json::to_value(ColumnDescriptor::new("id", "integer", false)).unwrap();
        assert!(json.get("numeric_precision").is_none());
        assert_eq!(json["is_nullable"], "NO");
        assert!(json["column_default"].is_null());
    }

    #[test]
    fn test_display_type() {
        let mut col = ColumnDescriptor::new("name", "character varying", true);
        col.character_maximum_length = Some(50);
        assert_eq!(col.display_type(), "character varying(50)");

        let mut price = ColumnDescriptor::new("price", "numeric", true);
        price.numeric_precision = Some(10);
        price.numeric_scale = Some(2);
        assert_eq!(price.display_type(), "numeric(10,2)");

        let mut id = ColumnDescriptor::new("id", "integer", false);
        id.numeric_precision = Some(32);
        id.numeric_scale = Some(0);
        assert_eq!(id.display_type(), "integer");
        assert!(!id.is_nullable());
    }
}
