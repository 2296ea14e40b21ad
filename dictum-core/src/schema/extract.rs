//! Schema extraction pass.

use super::cache::{schema_fingerprint, SchemaCache};
use super::{ColumnInfo, SchemaMap, TableSchema};
use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};
use crate::inspect::{inspector_for, Inspector};
use crate::security::qualify;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A per-table failure recorded during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    /// `schema.table` the failure belongs to, or the cache path for
    /// snapshot I/O problems.
    pub table: String,
    pub message: String,
}

/// The outcome of one extraction pass: best-effort tables plus whatever
/// went wrong along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub tables: SchemaMap,
    pub errors: Vec<ExtractionIssue>,
    /// Canonical hash of `tables` as freshly extracted.
    pub fingerprint: String,
    /// True when the snapshot cache matched and its tables were substituted.
    pub from_cache: bool,
}

/// Walks every non-system schema and table and assembles the schema map.
///
/// Per-table failures become [`ExtractionIssue`]s and the scan continues;
/// only a failure to enumerate schemas at all is propagated, since nothing
/// can be extracted without the catalog.
pub struct SchemaExtractor {
    engine: Arc<dyn Engine>,
    inspector: Arc<dyn Inspector>,
    cache: Option<SchemaCache>,
}

impl SchemaExtractor {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let inspector = inspector_for(engine.clone());
        Self {
            engine,
            inspector,
            cache: None,
        }
    }

    /// Attach a snapshot cache consulted and rewritten by [`Self::extract`].
    pub fn with_cache(mut self, cache: SchemaCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn inspector(&self) -> &Arc<dyn Inspector> {
        &self.inspector
    }

    /// Run a full extraction pass.
    #[instrument(skip(self))]
    pub async fn extract(&self) -> CoreResult<ExtractionReport> {
        let default_schema = self.inspector.default_schema();
        let mut tables = SchemaMap::new();
        let mut errors = Vec::new();

        for schema in self.inspector.list_schemas().await? {
            let table_names = match self.inspector.list_tables(&schema).await {
                Ok(names) => names,
                Err(error) => {
                    warn!(schema, %error, "cannot list tables, skipping schema");
                    errors.push(ExtractionIssue {
                        table: schema.clone(),
                        message: error.to_string(),
                    });
                    continue;
                }
            };
            for table in table_names {
                match self.extract_table(&table, &schema).await {
                    Ok(extracted) => {
                        tables.insert(extracted.map_key(default_schema), extracted);
                    }
                    Err(error) => {
                        warn!(schema, table, %error, "table extraction failed");
                        errors.push(ExtractionIssue {
                            table: format!("{schema}.{table}"),
                            message: error.to_string(),
                        });
                    }
                }
            }
        }

        let fingerprint = schema_fingerprint(&tables)?;
        let mut from_cache = false;
        if let Some(cache) = &self.cache {
            match cache.load().await {
                Ok(Some(snapshot)) if snapshot.fingerprint == fingerprint => {
                    info!(fingerprint, "schema unchanged, substituting cached snapshot");
                    tables = snapshot.tables;
                    from_cache = true;
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(%error, "schema cache unreadable, extracting fresh");
                    errors.push(ExtractionIssue {
                        table: cache.path().display().to_string(),
                        message: error.to_string(),
                    });
                }
            }
            if let Err(error) = cache.store(&fingerprint, &tables).await {
                warn!(%error, "schema cache write failed");
                errors.push(ExtractionIssue {
                    table: cache.path().display().to_string(),
                    message: error.to_string(),
                });
            }
        }

        info!(
            tables = tables.len(),
            errors = errors.len(),
            from_cache,
            "extraction pass complete"
        );
        Ok(ExtractionReport {
            tables,
            errors,
            fingerprint,
            from_cache,
        })
    }

    /// Assemble one table's metadata.
    #[instrument(skip(self))]
    async fn extract_table(&self, table: &str, schema: &str) -> CoreResult<TableSchema> {
        let column_meta = self.inspector.columns(table, schema).await?;
        let mut primary_keys = self.inspector.primary_key(table, schema).await?;
        let mut foreign_keys = self.inspector.foreign_keys(table, schema).await?;
        let unique_constraints = self.inspector.unique_constraints(table, schema).await?;
        let indexes = self.inspector.indexes(table, schema).await?;

        let known = |name: &str| column_meta.iter().any(|c| c.name == name);
        primary_keys.retain(|pk| known(pk));
        foreign_keys.retain(|fk| known(&fk.column));

        let fk_targets: BTreeMap<&str, String> = foreign_keys
            .iter()
            .map(|fk| {
                (
                    fk.column.as_str(),
                    format!("{}.{}", fk.ref_table, fk.ref_column),
                )
            })
            .collect();
        let columns = column_meta
            .into_iter()
            .map(|meta| {
                let is_primary_key = primary_keys.contains(&meta.name);
                let foreign_key_ref = fk_targets.get(meta.name.as_str()).cloned();
                ColumnInfo {
                    is_primary_key,
                    is_foreign_key: foreign_key_ref.is_some(),
                    foreign_key_ref,
                    name: meta.name,
                    data_type: meta.data_type,
                    nullable: meta.nullable,
                    default: meta.default,
                }
            })
            .collect();

        let row_count = match self.row_count(table, schema).await {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(schema, table, %error, "row count unavailable");
                None
            }
        };

        Ok(TableSchema {
            table_name: table.to_string(),
            schema_name: schema.to_string(),
            columns,
            primary_keys,
            foreign_keys,
            unique_constraints,
            indexes,
            row_count,
        })
    }

    async fn row_count(&self, table: &str, schema: &str) -> CoreResult<i64> {
        let sql = format!("SELECT COUNT(*) AS row_count FROM {}", qualify(schema, table)?);
        let rs = self.engine.execute(&sql).await?;
        rs.scalar_i64()
            .ok_or_else(|| CoreError::query_failed(sql, "count query returned no rows"))
    }
}
