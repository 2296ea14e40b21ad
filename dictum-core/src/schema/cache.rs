//! Schema fingerprinting and the on-disk snapshot cache.
//!
//! The fingerprint is a SHA-256 over a canonical JSON encoding of the
//! schema map with `row_count` masked out, so only structural change moves
//! the hash. Keys sort at every level, so two structurally equal maps
//! always hash identically. The hash is only ever compared, never decoded.

use super::SchemaMap;
use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Canonical structural hash of a schema map, as lowercase hex.
///
/// Row counts are masked before hashing: volume drift under an identical
/// structure keeps the fingerprint stable.
pub fn schema_fingerprint(tables: &SchemaMap) -> CoreResult<String> {
    let mut canonical = serde_json::to_value(tables)?;
    if let Some(entries) = canonical.as_object_mut() {
        for table in entries.values_mut() {
            if let Some(fields) = table.as_object_mut() {
                fields.insert("row_count".to_string(), serde_json::Value::Null);
            }
        }
    }
    let bytes = serde_json::to_vec(&canonical)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// The persisted form of one extraction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub tables: SchemaMap,
}

/// JSON snapshot file read at extraction start and rewritten at the end.
///
/// Presence governs whether fingerprint comparison happens at all; age is
/// irrelevant.
#[derive(Debug, Clone)]
pub struct SchemaCache {
    path: PathBuf,
}

impl SchemaCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the previous snapshot; `Ok(None)` when no file exists yet.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> CoreResult<Option<SchemaSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot file");
                return Ok(None);
            }
            Err(e) => return Err(CoreError::cache_io(self.path.display().to_string(), e)),
        };
        let snapshot: SchemaSnapshot = serde_json::from_slice(&bytes)?;
        debug!(fingerprint = %snapshot.fingerprint, "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Persist a fresh snapshot, replacing any previous one.
    #[instrument(skip(self, tables), fields(path = %self.path.display()))]
    pub async fn store(&self, fingerprint: &str, tables: &SchemaMap) -> CoreResult<()> {
        let snapshot = SchemaSnapshot {
            fingerprint: fingerprint.to_string(),
            generated_at: Utc::now(),
            tables: tables.clone(),
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| CoreError::cache_io(self.path.display().to_string(), e))?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| CoreError::cache_io(self.path.display().to_string(), e))?;
        debug!(fingerprint, tables = tables.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnInfo, TableSchema};

    fn table(name: &str, extra_column: bool) -> TableSchema {
        let mut columns = vec![ColumnInfo {
            name: "id".into(),
            data_type: "INTEGER".into(),
            nullable: false,
            default: None,
            is_primary_key: true,
            is_foreign_key: false,
            foreign_key_ref: None,
        }];
        if extra_column {
            columns.push(ColumnInfo {
                name: "note".into(),
                data_type: "VARCHAR".into(),
                nullable: true,
                default: None,
                is_primary_key: false,
                is_foreign_key: false,
                foreign_key_ref: None,
            });
        }
        TableSchema {
            table_name: name.into(),
            schema_name: "main".into(),
            columns,
            primary_keys: vec!["id".into()],
            foreign_keys: vec![],
            unique_constraints: vec![],
            indexes: vec![],
            row_count: Some(0),
        }
    }

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let mut forward = SchemaMap::new();
        forward.insert("a".into(), table("a", false));
        forward.insert("b".into(), table("b", false));

        let mut reverse = SchemaMap::new();
        reverse.insert("b".into(), table("b", false));
        reverse.insert("a".into(), table("a", false));

        assert_eq!(
            schema_fingerprint(&forward).unwrap(),
            schema_fingerprint(&reverse).unwrap()
        );
    }

    #[test]
    fn fingerprint_ignores_row_drift() {
        let mut before = SchemaMap::new();
        before.insert("a".into(), table("a", false));

        let mut after = SchemaMap::new();
        let mut grown = table("a", false);
        grown.row_count = Some(125_000);
        after.insert("a".into(), grown);

        assert_eq!(
            schema_fingerprint(&before).unwrap(),
            schema_fingerprint(&after).unwrap()
        );
    }

    #[test]
    fn fingerprint_sees_structural_change() {
        let mut base = SchemaMap::new();
        base.insert("a".into(), table("a", false));

        let mut grown = SchemaMap::new();
        grown.insert("a".into(), table("a", true));

        assert_ne!(
            schema_fingerprint(&base).unwrap(),
            schema_fingerprint(&grown).unwrap()
        );
    }

    #[tokio::test]
    async fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SchemaCache::new(dir.path().join("nested/schema_cache.json"));
        assert!(cache.load().await.unwrap().is_none());

        let mut tables = SchemaMap::new();
        tables.insert("a".into(), table("a", true));
        let fingerprint = schema_fingerprint(&tables).unwrap();
        cache.store(&fingerprint, &tables).await.unwrap();

        let loaded = cache.load().await.unwrap().unwrap();
        assert_eq!(loaded.fingerprint, fingerprint);
        assert_eq!(loaded.tables, tables);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema_cache.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        assert!(SchemaCache::new(&path).load().await.is_err());
    }
}
