//! Normalized schema model and the extraction pass that builds it.
//!
//! The shapes here are the crate's primary public output: one
//! [`TableSchema`] per discovered table, assembled by the
//! [`SchemaExtractor`] from inspector results and serialized verbatim into
//! the snapshot cache and downstream artifacts.

pub mod cache;
mod extract;

pub use cache::{schema_fingerprint, SchemaCache, SchemaSnapshot};
pub use extract::{ExtractionIssue, ExtractionReport, SchemaExtractor};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One column of a discovered table.
///
/// `data_type` is the backend's own type string, untranslated; consumers
/// that need dialect-neutral types must map it themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name as reported by the catalog.
    pub name: String,
    /// Raw backend type string (`VARCHAR`, `numeric(10,2)`, ...).
    pub data_type: String,
    /// Whether NULL values are accepted.
    pub nullable: bool,
    /// Default expression, verbatim, when one is declared.
    pub default: Option<String>,
    /// True when the column is part of the table's primary key.
    pub is_primary_key: bool,
    /// True when the column participates in a foreign key.
    pub is_foreign_key: bool,
    /// Referenced `table.column` when `is_foreign_key` is set.
    pub foreign_key_ref: Option<String>,
}

/// A single-column foreign key edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing column in this table.
    pub column: String,
    /// Referenced table name.
    pub ref_table: String,
    /// Referenced column name.
    pub ref_column: String,
}

/// A named unique constraint and the columns it spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// A named index, with the indexed column list and uniqueness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Everything the extractor knows about one table.
///
/// Built once per extraction pass and replaced wholesale on the next; no
/// partial updates. `row_count` is `None` when the count query failed for a
/// table whose metadata was otherwise readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    pub schema_name: String,
    /// Columns in catalog (ordinal) order.
    pub columns: Vec<ColumnInfo>,
    /// Primary-key column names, in key order.
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub indexes: Vec<IndexInfo>,
    pub row_count: Option<i64>,
}

impl TableSchema {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Map key for this table: the bare name inside `default_schema`,
    /// `schema.table` everywhere else.
    pub fn map_key(&self, default_schema: &str) -> String {
        if self.schema_name == default_schema {
            self.table_name.clone()
        } else {
            format!("{}.{}", self.schema_name, self.table_name)
        }
    }

    /// Whether every constraint references a column this table actually has.
    pub fn is_consistent(&self) -> bool {
        let has = |name: &str| self.columns.iter().any(|c| c.name == name);
        self.primary_keys.iter().all(|pk| has(pk))
            && self.foreign_keys.iter().all(|fk| has(&fk.column))
    }
}

/// The full extracted schema, keyed per [`TableSchema::map_key`].
///
/// `BTreeMap` keeps serialization order stable for fingerprinting; display
/// ordering is still the consumer's concern.
pub type SchemaMap = BTreeMap<String, TableSchema>;

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> TableSchema {
        TableSchema {
            table_name: "orders".into(),
            schema_name: "main".into(),
            columns: vec![
                ColumnInfo {
                    name: "id".into(),
                    data_type: "INTEGER".into(),
                    nullable: false,
                    default: None,
                    is_primary_key: true,
                    is_foreign_key: false,
                    foreign_key_ref: None,
                },
                ColumnInfo {
                    name: "customer_id".into(),
                    data_type: "INTEGER".into(),
                    nullable: false,
                    default: None,
                    is_primary_key: false,
                    is_foreign_key: true,
                    foreign_key_ref: Some("customers.id".into()),
                },
            ],
            primary_keys: vec!["id".into()],
            foreign_keys: vec![ForeignKey {
                column: "customer_id".into(),
                ref_table: "customers".into(),
                ref_column: "id".into(),
            }],
            unique_constraints: vec![],
            indexes: vec![],
            row_count: Some(10),
        }
    }

    #[test]
    fn map_key_elides_default_schema() {
        let t = orders();
        assert_eq!(t.map_key("main"), "orders");
        assert_eq!(t.map_key("public"), "main.orders");
    }

    #[test]
    fn consistency_requires_known_columns() {
        let mut t = orders();
        assert!(t.is_consistent());
        t.primary_keys.push("ghost".into());
        assert!(!t.is_consistent());
    }

    #[test]
    fn column_lookup() {
        let t = orders();
        assert!(t.column("customer_id").is_some());
        assert!(t.column("missing").is_none());
    }
}
