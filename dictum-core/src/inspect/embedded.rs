//! Inspector for the embedded backend.

use super::{parse_columns, parse_foreign_keys, text_column, CheckConstraint, ColumnMeta, Inspector};
use crate::engine::Engine;
use crate::error::CoreResult;
use crate::schema::{ForeignKey, IndexInfo, UniqueConstraint};
use crate::security::escape_literal;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Schemas the embedded catalog exposes that are not user data.
const SYSTEM_SCHEMAS: [&str; 2] = ["information_schema", "pg_catalog"];

/// Discovery over the embedded engine's `information_schema`.
///
/// The embedded catalog covers schemata, tables, columns, and PK/FK
/// constraints; unique constraints, check constraints, and indexes have no
/// queryable view and degrade to empty results.
pub struct EmbeddedInspector {
    engine: Arc<dyn Engine>,
}

impl EmbeddedInspector {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Inspector for EmbeddedInspector {
    fn default_schema(&self) -> &'static str {
        "main"
    }

    #[instrument(skip(self))]
    async fn list_schemas(&self) -> CoreResult<Vec<String>> {
        let rs = self
            .engine
            .execute(
                "SELECT DISTINCT schema_name FROM information_schema.schemata \
                 ORDER BY schema_name",
            )
            .await?;
        Ok(text_column(&rs, "schema_name")
            .into_iter()
            .filter(|s| !SYSTEM_SCHEMAS.contains(&s.as_str()))
            .collect())
    }

    #[instrument(skip(self))]
    async fn list_tables(&self, schema: &str) -> CoreResult<Vec<String>> {
        let sql = format!(
            "SELECT table_name FROM information_schema.tables \
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
            "SELECT column_name, data_type, is_nullable, column_default \
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
            "SELECT kcu.column_name \
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
        let sql = format!(
            "SELECT \
                 kcu.column_name AS from_column, \
                 ccu.table_name AS to_table, \
                 ccu.column_name AS to_column \
             FROM information_schema.table_constraints tc \
             JOIN information_schema.key_column_usage kcu \
               ON tc.constraint_name = kcu.constraint_name \
             JOIN information_schema.constraint_column_usage ccu \
               ON tc.constraint_name = ccu.constraint_name \
             WHERE tc.table_schema = {} \
               AND tc.table_name = {} \
               AND tc.constraint_type = 'FOREIGN KEY'",
            escape_literal(schema)?,
            escape_literal(table)?
        );
        let rs = self.engine.execute(&sql).await?;
        Ok(parse_foreign_keys(&rs))
    }

    async fn unique_constraints(
        &self,
        table: &str,
        _schema: &str,
    ) -> CoreResult<Vec<UniqueConstraint>> {
        debug!(table, "unique constraints not exposed by embedded catalog");
        Ok(vec![])
    }

    async fn check_constraints(
        &self,
        table: &str,
        _schema: &str,
    ) -> CoreResult<Vec<CheckConstraint>> {
        debug!(table, "check constraints not exposed by embedded catalog");
        Ok(vec![])
    }

    async fn indexes(&self, table: &str, _schema: &str) -> CoreResult<Vec<IndexInfo>> {
        debug!(table, "indexes not exposed by embedded catalog");
        Ok(vec![])
    }
}
