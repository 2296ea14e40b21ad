//! Inspector for the client/server backend.

use super::{parse_columns, parse_foreign_keys, text_column, CheckConstraint, ColumnMeta, Inspector};
use crate::engine::Engine;
use crate::error::CoreResult;
use crate::schema::{ForeignKey, IndexInfo, UniqueConstraint};
use crate::security::escape_literal;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::instrument;

/// Server-internal schemas, never reported.
const SYSTEM_SCHEMAS: [&str; 3] = ["information_schema", "pg_catalog", "pg_toast"];

/// Per-session schema name prefixes, versioned per backend release.
const SYSTEM_SCHEMA_PREFIXES: [&str; 2] = ["pg_temp_", "pg_toast_temp_"];

/// Discovery over the server's `information_schema` and `pg_indexes`.
///
/// Catalog identifier columns are cast to `text` in the SQL; the wire types
/// behind them are identifier domains that do not decode as plain strings.
pub struct ServerInspector {
    engine: Arc<dyn Engine>,
}

impl ServerInspector {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.contains(&name)
        || SYSTEM_SCHEMA_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

#[async_trait]
impl Inspector for ServerInspector {
    fn default_schema(&self) -> &'static str {
        "public"
    }

    #[instrument(skip(self))]
    async fn list_schemas(&self) -> CoreResult<Vec<String>> {
        let rs = self
            .engine
            .execute(
                "SELECT schema_name::text AS schema_name \
                 FROM information_schema.schemata \
                 ORDER BY schema_name",
            )
            .await?;
        Ok(text_column(&rs, "schema_name")
            .into_iter()
            .filter(|s| !is_system_schema(s))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_tables(&self, schema: &str) -> CoreResult<Vec<String>> {
        let sql = format!(
            "SELECT table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            escape_literal(schema)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(text_column(&rs, "table_name"))
    }

    #[instrument(skip(self))]
    async fn columns(&self, table: &str, schema: &str) -> CoreResult<Vec<ColumnMeta>> {
        let sql = format!(
            "SELECT column_name::text AS column_name, \
                    data_type::text AS data_type, \
                    is_nullable::text AS is_nullable, \
                    column_default::text AS column_default \
             FROM information_schema.columns \
             WHERE table_schema = {} AND table_name = {} \
             ORDER BY ordinal_position",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(parse_columns(&rs))
    }

    #[instrument(skip(self))]
    async fn primary_key(&self, table: &str, schema: &str) -> CoreResult<Vec<String>> {
        let sql = format!(
            "SELECT kcu.column_name::text AS column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
              AND tc.table_schema = kcu.table_schema \
             WHERE tc.table_schema = {} \
               AND tc.table_name = {} \
               AND tc.constraint_type = 'PRIMARY KEY' \
             ORDER BY kcu.ordinal_position",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(text_column(&rs, "column_name"))
    }

    #[instrument(skip(self))]
    async fn foreign_keys(&self, table: &str, schema: &str) -> CoreResult<Vec<ForeignKey>> {
        // The referenced column comes from the unique constraint's own
        // key_column_usage row, paired by position_in_unique_constraint.
        let sql = format!(
            "SELECT \
                 kcu.column_name::text AS from_column, \
                 ref.table_name::text AS to_table, \
                 ref.column_name::text AS to_column \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.table_schema = tc.table_schema \
             JOIN information_schema.referential_constraints rc \
               ON rc.constraint_name = tc.constraint_name \
              AND rc.constraint_schema = tc.table_schema \
             JOIN information_schema.key_column_usage ref \
               ON ref.constraint_name = rc.unique_constraint_name \
              AND ref.table_schema = rc.unique_constraint_schema \
              AND ref.ordinal_position = kcu.position_in_unique_constraint \
             WHERE tc.table_schema = {} \
               AND tc.table_name = {} \
               AND tc.constraint_type = 'FOREIGN KEY' \
             ORDER BY kcu.ordinal_position",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(parse_foreign_keys(&rs))
    }

    #[instrument(skip(self))]
    async fn unique_constraints(
        &self,
        table: &str,
        schema: &str,
    ) -> CoreResult<Vec<UniqueConstraint>> {
        let sql = format!(
            "SELECT tc.constraint_name::text AS constraint_name, \
                    kcu.column_name::text AS column_name \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON kcu.constraint_name = tc.constraint_name \
              AND kcu.table_schema = tc.table_schema \
             WHERE tc.table_schema = {} \
               AND tc.table_name = {} \
               AND tc.constraint_type = 'UNIQUE' \
             ORDER BY tc.constraint_name, kcu.ordinal_position",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;

        let mut constraints: Vec<UniqueConstraint> = Vec::new();
        for row in rs.iter() {
            let (Some(name), Some(column)) =
                (row.get_str("constraint_name"), row.get_str("column_name"))
            else {
                continue;
            };
            match constraints.last_mut() {
                Some(last) if last.name == name => last.columns.push(column.to_string()),
                _ => constraints.push(UniqueConstraint {
                    name: name.to_string(),
                    columns: vec![column.to_string()],
                }),
            }
        }
        Ok(constraints)
    }

    #[instrument(skip(self))]
    async fn check_constraints(
        &self,
        table: &str,
        schema: &str,
    ) -> CoreResult<Vec<CheckConstraint>> {
        // NOT NULL declarations surface here as synthetic `*_not_null` rows;
        // they are already captured by ColumnMeta.nullable.
        let sql = format!(
            "SELECT cc.constraint_name::text AS constraint_name, \
                    cc.check_clause::text AS check_clause \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.check_constraints cc \
               ON cc.constraint_name = tc.constraint_name \
              AND cc.constraint_schema = tc.table_schema \
             WHERE tc.table_schema = {} \
               AND tc.table_name = {} \
               AND tc.constraint_type = 'CHECK' \
               AND cc.constraint_name NOT LIKE '%_not_null' \
             ORDER BY cc.constraint_name",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(rs
            .iter()
            .filter_map(|row| {
                Some(CheckConstraint {
                    name: row.get_str("constraint_name")?.to_string(),
                    expression: row.get_str("check_clause")?.to_string(),
                })
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn indexes(&self, table: &str, schema: &str) -> CoreResult<Vec<IndexInfo>> {
        let sql = format!(
            "SELECT indexname::text AS index_name, indexdef::text AS index_def \
             FROM pg_indexes \
             WHERE schemaname = {} AND tablename = {} \
             ORDER BY indexname",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(rs
            .iter()
            .filter_map(|row| {
                let name = row.get_str("index_name")?.to_string();
                let def = row.get_str("index_def")?;
                Some(IndexInfo {
                    name,
                    columns: indexed_columns(def),
                    unique: def.trim_start().to_ascii_uppercase().starts_with("CREATE UNIQUE"),
                })
            })
            .collect())
    }
}

/// Pull the column list out of an index definition statement.
fn indexed_columns(index_def: &str) -> Vec<String> {
    static COLUMN_LIST: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"\(([^)]*)\)").expect("valid pattern"));
    COLUMN_LIST
        .captures(index_def)
        .and_then(|caps| caps.get(1))
        .map(|list| {
            list.as_str()
                .split(',')
                .map(|c| c.trim().trim_matches('"').to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_definitions_parse() {
        let def = "CREATE UNIQUE INDEX users_email_key ON public.users USING btree (email)";
        assert_eq!(indexed_columns(def), vec!["email"]);

        let multi = "CREATE INDEX idx_orders ON public.orders USING btree (customer_id, placed_at)";
        assert_eq!(indexed_columns(multi), vec!["customer_id", "placed_at"]);

        assert!(indexed_columns("garbage").is_empty());
    }

    #[test]
    fn system_schema_filter() {
        assert!(is_system_schema("pg_catalog"));
        assert!(is_system_schema("pg_temp_3"));
        assert!(is_system_schema("pg_toast_temp_1"));
        assert!(!is_system_schema("public"));
        assert!(!is_system_schema("analytics"));
    }
}
