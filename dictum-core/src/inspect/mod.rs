//! Capability-aware schema discovery over an engine.
//!
//! An [`Inspector`] answers metadata questions in backend-appropriate SQL
//! and normalizes the answers. The contract for every operation is
//! degradation over failure: a backend that cannot express a query returns
//! an empty result, and each operation stays independently usable.

mod embedded;
mod server;

pub use embedded::EmbeddedInspector;
pub use server::ServerInspector;

use crate::engine::{Engine, EngineKind, ResultSet};
use crate::error::CoreResult;
use crate::schema::{ForeignKey, IndexInfo, UniqueConstraint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Raw column metadata before primary/foreign-key flags are merged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// A named check constraint and its expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub expression: String,
}

/// Schema discovery operations.
///
/// All operations are table-scoped except [`Inspector::list_schemas`] and
/// return `Ok` with an empty collection when the backend has no catalog
/// surface for the question.
#[async_trait]
pub trait Inspector: Send + Sync {
    /// Schema that unqualified tables belong to on this backend.
    fn default_schema(&self) -> &'static str;

    /// Non-system schema names, sorted.
    async fn list_schemas(&self) -> CoreResult<Vec<String>>;

    /// Base-table names within one schema, sorted.
    async fn list_tables(&self, schema: &str) -> CoreResult<Vec<String>>;

    /// Columns in ordinal order.
    async fn columns(&self, table: &str, schema: &str) -> CoreResult<Vec<ColumnMeta>>;

    /// Primary-key column names in key order.
    async fn primary_key(&self, table: &str, schema: &str) -> CoreResult<Vec<String>>;

    /// Outgoing foreign-key edges.
    async fn foreign_keys(&self, table: &str, schema: &str) -> CoreResult<Vec<ForeignKey>>;

    async fn unique_constraints(&self, table: &str, schema: &str)
        -> CoreResult<Vec<UniqueConstraint>>;

    async fn check_constraints(&self, table: &str, schema: &str)
        -> CoreResult<Vec<CheckConstraint>>;

    async fn indexes(&self, table: &str, schema: &str) -> CoreResult<Vec<IndexInfo>>;
}

/// Build the inspector matching an engine's backend.
pub fn inspector_for(engine: Arc<dyn Engine>) -> Arc<dyn Inspector> {
    match engine.kind() {
        EngineKind::Embedded => Arc::new(EmbeddedInspector::new(engine)),
        EngineKind::Server => Arc::new(ServerInspector::new(engine)),
    }
}

/// Collect one text column out of a result, skipping NULL cells.
fn text_column(rs: &ResultSet, column: &str) -> Vec<String> {
    rs.iter()
        .filter_map(|row| row.get_str(column).map(str::to_string))
        .collect()
}

/// Normalize an `information_schema.columns` result.
fn parse_columns(rs: &ResultSet) -> Vec<ColumnMeta> {
    rs.iter()
        .filter_map(|row| {
            let name = row.get_str("column_name")?.to_string();
            Some(ColumnMeta {
                name,
                data_type: row
                    .get_str("data_type")
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                nullable: row
                    .get_str("is_nullable")
                    .map(|v| v.eq_ignore_ascii_case("YES"))
                    .unwrap_or(true),
                default: row.get_str("column_default").map(str::to_string),
            })
        })
        .collect()
}

/// Normalize a `from_column / to_table / to_column` constraint join result.
fn parse_foreign_keys(rs: &ResultSet) -> Vec<ForeignKey> {
    rs.iter()
        .filter_map(|row| {
            Some(ForeignKey {
                column: row.get_str("from_column")?.to_string(),
                ref_table: row.get_str("to_table")?.to_string(),
                ref_column: row.get_str("to_column")?.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnDesc, SqlValue};

    fn columns_result() -> ResultSet {
        let cols = ["column_name", "data_type", "is_nullable", "column_default"]
            .iter()
            .map(|n| ColumnDesc {
                name: (*n).to_string(),
                type_name: "VARCHAR".into(),
            })
            .collect();
        ResultSet::new(
            cols,
            vec![
                vec![
                    SqlValue::Text("id".into()),
                    SqlValue::Text("INTEGER".into()),
                    SqlValue::Text("NO".into()),
                    SqlValue::Null,
                ],
                vec![
                    SqlValue::Text("email".into()),
                    SqlValue::Text("VARCHAR".into()),
                    SqlValue::Text("YES".into()),
                    SqlValue::Text("''".into()),
                ],
            ],
        )
    }

    #[test]
    fn column_rows_normalize() {
        let parsed = parse_columns(&columns_result());
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "id");
        assert!(!parsed[0].nullable);
        assert_eq!(parsed[0].default, None);
        assert!(parsed[1].nullable);
        assert_eq!(parsed[1].default.as_deref(), Some("''"));
    }

    #[test]
    fn foreign_key_rows_normalize() {
        let cols = ["from_column", "to_table", "to_column"]
            .iter()
            .map(|n| ColumnDesc {
                name: (*n).to_string(),
                type_name: "VARCHAR".into(),
            })
            .collect();
        let rs = ResultSet::new(
            cols,
            vec![vec![
                SqlValue::Text("customer_id".into()),
                SqlValue::Text("customers".into()),
                SqlValue::Text("id".into()),
            ]],
        );
        let fks = parse_foreign_keys(&rs);
        assert_eq!(
            fks,
            vec![ForeignKey {
                column: "customer_id".into(),
                ref_table: "customers".into(),
                ref_column: "id".into(),
            }]
        );
    }
}
