//! File-backed embedded engine.

use super::result::{ColumnDesc, ResultSet, SqlValue};
use super::{Engine, EngineKind};
use crate::error::{CoreError, CoreResult};
use async_trait::async_trait;
use duckdb::types::{TimeUnit, Value};
use duckdb::Connection;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Engine over a single embedded database file.
///
/// The underlying driver is synchronous; statements run inline on the
/// calling task under a lock that serializes access to the connection.
pub struct EmbeddedEngine {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
}

impl EmbeddedEngine {
    /// Open (or create) the database file at `path`, creating missing
    /// parent directories first.
    #[instrument]
    pub async fn open(path: impl AsRef<Path> + std::fmt::Debug) -> CoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CoreError::connection_failed(format!(
                        "cannot create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }
        let existed = path.exists();
        let conn = Connection::open(&path).map_err(|e| {
            CoreError::connection_failed(format!(
                "cannot open embedded database {}: {e}",
                path.display()
            ))
        })?;
        if existed {
            info!(path = %path.display(), "opened embedded database");
        } else {
            warn!(path = %path.display(), "embedded database file did not exist, created empty");
        }
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
        })
    }

    /// In-memory engine, mainly for tests and scratch work.
    pub fn open_in_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CoreError::connection_failed(format!("cannot open in-memory database: {e}"))
        })?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Engine for EmbeddedEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Embedded
    }

    fn descriptor(&self) -> String {
        format!("duckdb://{}", self.path.display())
    }

    async fn execute(&self, sql: &str) -> CoreResult<ResultSet> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or_else(|| CoreError::engine_unavailable("embedded connection disposed"))?;
        debug!(sql, "executing statement");
        run_statement(conn, sql)
    }

    async fn dispose(&self) -> CoreResult<()> {
        let mut guard = self.conn.lock().await;
        if guard.take().is_some() {
            info!(path = %self.path.display(), "embedded connection disposed");
        }
        Ok(())
    }
}

fn run_statement(conn: &Connection, sql: &str) -> CoreResult<ResultSet> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| CoreError::query_failed(sql, e.to_string()))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| CoreError::query_failed(sql, e.to_string()))?;

    // Column metadata only becomes available once the statement has run.
    let names: Vec<String> = rows
        .as_ref()
        .map(|s| s.column_names())
        .unwrap_or_default();
    let width = names.len();

    let mut data: Vec<Vec<SqlValue>> = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|e| CoreError::query_failed(sql, e.to_string()))?
    {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let raw: Value = row
                .get(idx)
                .map_err(|e| CoreError::query_failed(sql, e.to_string()))?;
            values.push(convert_value(raw));
        }
        data.push(values);
    }

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(idx, name)| {
            let type_name = data
                .iter()
                .filter_map(|r| r.get(idx))
                .find(|v| !v.is_null())
                .map(|v| v.type_name())
                .unwrap_or("NULL")
                .to_string();
            ColumnDesc { name, type_name }
        })
        .collect();
    Ok(ResultSet::new(columns, data))
}

/// Collapse the driver's value space into the engine-neutral one.
fn convert_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(v) => SqlValue::Bool(v),
        Value::TinyInt(v) => SqlValue::Int(v as i64),
        Value::SmallInt(v) => SqlValue::Int(v as i64),
        Value::Int(v) => SqlValue::Int(v as i64),
        Value::BigInt(v) => SqlValue::Int(v),
        Value::HugeInt(v) => i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Float(v as f64)),
        Value::UTinyInt(v) => SqlValue::Int(v as i64),
        Value::USmallInt(v) => SqlValue::Int(v as i64),
        Value::UInt(v) => SqlValue::Int(v as i64),
        Value::UBigInt(v) => i64::try_from(v)
            .map(SqlValue::Int)
            .unwrap_or(SqlValue::Float(v as f64)),
        Value::Float(v) => SqlValue::Float(v as f64),
        Value::Double(v) => SqlValue::Float(v),
        Value::Decimal(v) => v
            .to_string()
            .parse::<f64>()
            .map(SqlValue::Float)
            .unwrap_or_else(|_| SqlValue::Text(v.to_string())),
        Value::Timestamp(unit, raw) => SqlValue::Text(timestamp_to_text(unit, raw)),
        Value::Date32(days) => SqlValue::Text(date_to_text(days)),
        Value::Text(v) => SqlValue::Text(v),
        Value::Blob(bytes) => SqlValue::Text(hex::encode(bytes)),
        other => SqlValue::Text(format!("{other:?}")),
    }
}

fn timestamp_to_text(unit: TimeUnit, raw: i64) -> String {
    let (secs, nanos) = match unit {
        TimeUnit::Second => (raw, 0u32),
        TimeUnit::Millisecond => (
            raw.div_euclid(1_000),
            (raw.rem_euclid(1_000) * 1_000_000) as u32,
        ),
        TimeUnit::Microsecond => (
            raw.div_euclid(1_000_000),
            (raw.rem_euclid(1_000_000) * 1_000) as u32,
        ),
        TimeUnit::Nanosecond => (
            raw.div_euclid(1_000_000_000),
            raw.rem_euclid(1_000_000_000) as u32,
        ),
    };
    chrono::DateTime::from_timestamp(secs, nanos)
        .map(|dt| dt.naive_utc().to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn date_to_text(days: i32) -> String {
    chrono::DateTime::from_timestamp(i64::from(days) * 86_400, 0)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| days.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn executes_and_types_results() {
        let engine = EmbeddedEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE t (id INTEGER, name VARCHAR, score DOUBLE)")
            .await
            .unwrap();
        engine
            .execute("INSERT INTO t VALUES (1, 'a', 1.5), (2, NULL, 2.5)")
            .await
            .unwrap();

        let rs = engine
            .execute("SELECT id, name, score FROM t ORDER BY id")
            .await
            .unwrap();
        assert_eq!(rs.len(), 2);
        let first = rs.first().unwrap();
        assert_eq!(first.get_i64("id"), Some(1));
        assert_eq!(first.get_str("name"), Some("a"));
        assert_eq!(first.get_f64("score"), Some(1.5));
        assert!(rs.row(1).unwrap().value("name").unwrap().is_null());
    }

    #[tokio::test]
    async fn empty_results_keep_column_names() {
        let engine = EmbeddedEngine::open_in_memory().unwrap();
        engine
            .execute("CREATE TABLE empty_t (id INTEGER)")
            .await
            .unwrap();
        let rs = engine
            .execute("SELECT id AS the_id FROM empty_t")
            .await
            .unwrap();
        assert!(rs.is_empty());
        assert_eq!(rs.columns().len(), 1);
        assert_eq!(rs.columns()[0].name, "the_id");
    }

    #[tokio::test]
    async fn disposed_engine_refuses_queries() {
        let engine = EmbeddedEngine::open_in_memory().unwrap();
        engine.dispose().await.unwrap();
        let err = engine.execute("SELECT 1").await.unwrap_err();
        assert!(matches!(err, CoreError::EngineUnavailable { .. }));
    }

    #[test]
    fn timestamp_units_render_consistently() {
        let s = timestamp_to_text(TimeUnit::Second, 1_700_000_000);
        let us = timestamp_to_text(TimeUnit::Microsecond, 1_700_000_000_000_000);
        assert_eq!(s, us);
        assert!(s.starts_with("2023-11-14"));
    }

    #[test]
    fn dates_are_iso_formatted() {
        assert_eq!(date_to_text(0), "1970-01-01");
        assert_eq!(date_to_text(19_000), "2022-01-08");
    }
}
