//! Statistical data-quality analysis over extracted schemas.
//!
//! Every metric is computed in SQL through the engine, in the dialect
//! subset both backends share (`FILTER` clauses, ordered-set percentiles,
//! text and double-precision casts). Metrics are independently invocable
//! and independently failable; degenerate input (no rows, all nulls)
//! produces a marked result, not an error.

mod benford;
mod correlation;
mod distribution;
mod outliers;

pub use benford::{BenfordReport, DigitFrequency, RiskLevel, BENFORD_CAVEAT};
pub use correlation::{CorrelationPair, CorrelationReport, CorrelationStrength};
pub use distribution::DistributionReport;
pub use outliers::{OutlierMethod, OutlierReport};

use crate::engine::Engine;
use crate::error::{CoreError, CoreResult};
use crate::schema::TableSchema;
use crate::security::{escape_identifier, qualify};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Per-column quality metrics.
///
/// `mean_value` and `std_dev` stay `None` for columns that do not cast to
/// a number; that is the normal state for text columns, not a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub column_name: String,
    pub null_count: i64,
    /// `null_count / total_rows`, `0.0` for an empty table.
    pub null_rate: f64,
    pub distinct_count: i64,
    /// Minimum under text-cast comparison, safe across types.
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub mean_value: Option<f64>,
    /// Sample standard deviation.
    pub std_dev: Option<f64>,
}

/// One metric that could not be computed for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Column the failing metric targeted, or the key list for table-level
    /// metrics.
    pub column: String,
    pub message: String,
}

/// Per-table quality summary assembled by [`QualityAnalyzer::analyze_table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQuality {
    pub table_name: String,
    pub row_count: i64,
    pub column_quality: Vec<ColumnQuality>,
    /// `unique key tuples / total rows`; `None` when the table has no
    /// primary key.
    pub pk_uniqueness_rate: Option<f64>,
    /// Timestamp column freshness was measured on, when one was detected.
    pub freshness_column: Option<String>,
    pub freshness_latest: Option<String>,
    pub freshness_oldest: Option<String>,
    /// `1 − mean(null_rate)` over the columns that were analyzed; `1.0`
    /// when there are none.
    pub overall_completeness: f64,
    /// Metrics that failed on this table. A failing column is recorded
    /// here and skipped; the rest of the table is still analyzed.
    pub errors: Vec<QualityIssue>,
}

/// Quality report for a whole run, keyed like the schema map.
pub type QualityReport = BTreeMap<String, TableQuality>;

/// Freshness measurement for one timestamp column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreshnessReport {
    pub table_name: String,
    pub column_name: String,
    pub latest: Option<String>,
    pub oldest: Option<String>,
    /// Days since the latest record, fractional.
    pub age_days: Option<f64>,
}

/// Computes quality metrics through an engine.
pub struct QualityAnalyzer {
    engine: Arc<dyn Engine>,
}

impl QualityAnalyzer {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    pub(crate) fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Full per-table pass: row count, per-column metrics, PK uniqueness,
    /// freshness, completeness.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn analyze_table(&self, table: &TableSchema) -> CoreResult<TableQuality> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let row_count = self.count_rows(&target).await?;

        let mut column_quality = Vec::with_capacity(table.columns.len());
        let mut errors = Vec::new();
        for column in &table.columns {
            match self.column_quality(table, &column.name).await {
                Ok(quality) => column_quality.push(quality),
                Err(error) => {
                    warn!(column = %column.name, %error, "column quality failed, skipping column");
                    errors.push(QualityIssue {
                        column: column.name.clone(),
                        message: error.to_string(),
                    });
                }
            }
        }

        let pk_uniqueness_rate = if table.primary_keys.is_empty() {
            None
        } else {
            match self.pk_uniqueness(table).await {
                Ok(rate) => Some(rate),
                Err(error) => {
                    warn!(%error, "primary key uniqueness failed, dropping metric");
                    errors.push(QualityIssue {
                        column: table.primary_keys.join(", "),
                        message: error.to_string(),
                    });
                    None
                }
            }
        };

        let mut freshness_column = detect_freshness_column(table);
        let mut freshness_latest = None;
        let mut freshness_oldest = None;
        if let Some(column) = &freshness_column {
            match self.freshness(table, column).await {
                Ok(report) => {
                    freshness_latest = report.latest;
                    freshness_oldest = report.oldest;
                }
                Err(error) => {
                    warn!(column, %error, "freshness query failed, dropping column");
                    freshness_column = None;
                }
            }
        }

        let overall_completeness = completeness(&column_quality);
        Ok(TableQuality {
            table_name: table.table_name.clone(),
            row_count,
            column_quality,
            pk_uniqueness_rate,
            freshness_column,
            freshness_latest,
            freshness_oldest,
            overall_completeness,
            errors,
        })
    }

    /// Null, cardinality, and basic statistics for one column.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn column_quality(
        &self,
        table: &TableSchema,
        column: &str,
    ) -> CoreResult<ColumnQuality> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let col = escape_identifier(column)?;
        let sql = format!(
            "SELECT \
                 COUNT(*) AS total_rows, \
                 COUNT(*) FILTER (WHERE {col} IS NULL) AS null_count, \
                 COUNT(DISTINCT {col}) AS distinct_count, \
                 MIN(CAST({col} AS TEXT)) AS min_value, \
                 MAX(CAST({col} AS TEXT)) AS max_value \
             FROM {target}"
        );
        let rs = self.engine.execute(&sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&sql, "aggregate returned no rows"))?;

        let total_rows = row.get_i64("total_rows").unwrap_or(0);
        let null_count = row.get_i64("null_count").unwrap_or(0);
        let null_rate = null_count as f64 / total_rows.max(1) as f64;

        // Numeric statistics are attempted through a cast; a failing cast
        // means a non-numeric column and leaves both fields empty.
        let numeric_sql = format!(
            "SELECT \
                 AVG({expr}) AS mean_value, \
                 STDDEV_SAMP({expr}) AS std_dev \
             FROM {target}",
            expr = numeric_expr(column)?
        );
        let (mean_value, std_dev) = match self.engine.execute(&numeric_sql).await {
            Ok(numeric) => {
                let row = numeric.first();
                (
                    row.and_then(|r| r.get_f64("mean_value")),
                    row.and_then(|r| r.get_f64("std_dev")),
                )
            }
            Err(error) => {
                debug!(column, %error, "numeric cast failed, column treated as non-numeric");
                (None, None)
            }
        };

        Ok(ColumnQuality {
            column_name: column.to_string(),
            null_count,
            null_rate,
            distinct_count: row.get_i64("distinct_count").unwrap_or(0),
            min_value: row.get_str("min_value").map(str::to_string),
            max_value: row.get_str("max_value").map(str::to_string),
            mean_value,
            std_dev,
        })
    }

    /// Fraction of rows carrying a unique primary-key tuple.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn pk_uniqueness(&self, table: &TableSchema) -> CoreResult<f64> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let key_list = table
            .primary_keys
            .iter()
            .map(|c| escape_identifier(c))
            .collect::<CoreResult<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT \
                 (SELECT COUNT(*) FROM {target}) AS total_rows, \
                 (SELECT COUNT(*) FROM ( \
                     SELECT {key_list} FROM {target} GROUP BY {key_list} \
                 ) AS sub) AS unique_pk_rows"
        );
        let rs = self.engine.execute(&sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&sql, "aggregate returned no rows"))?;
        let total = row.get_i64("total_rows").unwrap_or(0);
        let unique = row.get_i64("unique_pk_rows").unwrap_or(0);
        Ok(unique as f64 / total.max(1) as f64)
    }

    /// Latest/oldest record and fractional age for a timestamp column.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn freshness(
        &self,
        table: &TableSchema,
        column: &str,
    ) -> CoreResult<FreshnessReport> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let col = escape_identifier(column)?;
        let sql = format!(
            "SELECT \
                 CAST(MAX({col}) AS TEXT) AS latest_record, \
                 CAST(MIN({col}) AS TEXT) AS oldest_record, \
                 CAST(EXTRACT(EPOCH FROM MAX({col})) AS DOUBLE PRECISION) AS latest_epoch \
             FROM {target}"
        );
        let rs = self.engine.execute(&sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&sql, "aggregate returned no rows"))?;
        let age_days = row.get_f64("latest_epoch").map(|epoch| {
            (chrono::Utc::now().timestamp() as f64 - epoch) / 86_400.0
        });
        Ok(FreshnessReport {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            latest: row.get_str("latest_record").map(str::to_string),
            oldest: row.get_str("oldest_record").map(str::to_string),
            age_days,
        })
    }

    async fn count_rows(&self, target: &str) -> CoreResult<i64> {
        let sql = format!("SELECT COUNT(*) AS total_rows FROM {target}");
        let rs = self.engine.execute(&sql).await?;
        rs.scalar_i64()
            .ok_or_else(|| CoreError::query_failed(sql, "count query returned no rows"))
    }
}

/// `1 − mean(null_rate)`, with the empty-column-list convention of `1.0`.
pub fn completeness(columns: &[ColumnQuality]) -> f64 {
    if columns.is_empty() {
        return 1.0;
    }
    let mean_null_rate =
        columns.iter().map(|c| c.null_rate).sum::<f64>() / columns.len() as f64;
    1.0 - mean_null_rate
}

/// Pick the column freshness should be measured on.
///
/// Conventional audit-column names win over everything; otherwise the first
/// column with a declared timestamp/date type is used.
pub fn detect_freshness_column(table: &TableSchema) -> Option<String> {
    let find_name = |matches: fn(&str) -> bool| {
        table
            .columns
            .iter()
            .find(|c| matches(&c.name.to_ascii_lowercase()))
            .map(|c| c.name.clone())
    };
    find_name(|n| n == "updated_at")
        .or_else(|| find_name(|n| n == "created_at"))
        .or_else(|| find_name(|n| n.ends_with("_at")))
        .or_else(|| find_name(|n| n == "date" || n.ends_with("_date") || n.starts_with("date_")))
        .or_else(|| {
            find_name(|n| n == "timestamp" || n.ends_with("_timestamp") || n.starts_with("timestamp_"))
        })
        .or_else(|| {
            table
                .columns
                .iter()
                .find(|c| {
                    let ty = c.data_type.to_ascii_uppercase();
                    ty.contains("TIMESTAMP") || ty.contains("DATE")
                })
                .map(|c| c.name.clone())
        })
}

/// Whether a declared type is numeric enough for correlation/statistics.
pub(crate) fn is_numeric_type(data_type: &str) -> bool {
    const NUMERIC_TOKENS: [&str; 10] = [
        "TINYINT", "SMALLINT", "INTEGER", "BIGINT", "HUGEINT", "DECIMAL", "NUMERIC", "REAL",
        "DOUBLE", "FLOAT",
    ];
    let ty = data_type.to_ascii_uppercase();
    NUMERIC_TOKENS.iter().any(|token| ty.contains(token))
}

/// `CAST("col" AS DOUBLE PRECISION)`, the spelling both dialects accept.
pub(crate) fn numeric_expr(column: &str) -> CoreResult<String> {
    Ok(format!(
        "CAST({} AS DOUBLE PRECISION)",
        escape_identifier(column)?
    ))
}

/// Render a float for interpolation into generated SQL.
pub(crate) fn sql_float(value: f64) -> CoreResult<String> {
    if !value.is_finite() {
        return Err(CoreError::custom(format!(
            "non-finite value {value} cannot be rendered into SQL"
        )));
    }
    Ok(format!("({value})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;

    fn column(name: &str, data_type: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
            is_foreign_key: false,
            foreign_key_ref: None,
        }
    }

    fn table_with(columns: Vec<ColumnInfo>) -> TableSchema {
        TableSchema {
            table_name: "t".into(),
            schema_name: "main".into(),
            columns,
            primary_keys: vec![],
            foreign_keys: vec![],
            unique_constraints: vec![],
            indexes: vec![],
            row_count: None,
        }
    }

    fn quality(name: &str, null_rate: f64) -> ColumnQuality {
        ColumnQuality {
            column_name: name.into(),
            null_count: 0,
            null_rate,
            distinct_count: 0,
            min_value: None,
            max_value: None,
            mean_value: None,
            std_dev: None,
        }
    }

    #[test]
    fn completeness_is_one_minus_mean_null_rate() {
        let cols = vec![quality("a", 0.0), quality("b", 0.5)];
        assert!((completeness(&cols) - 0.75).abs() < 1e-12);
        assert_eq!(completeness(&[]), 1.0);
    }

    #[test]
    fn freshness_prefers_audit_columns() {
        let t = table_with(vec![
            column("id", "INTEGER"),
            column("created_at", "TIMESTAMP"),
            column("updated_at", "TIMESTAMP"),
        ]);
        assert_eq!(detect_freshness_column(&t).as_deref(), Some("updated_at"));
    }

    #[test]
    fn freshness_falls_back_to_declared_type() {
        let t = table_with(vec![
            column("id", "INTEGER"),
            column("recorded", "TIMESTAMP WITH TIME ZONE"),
        ]);
        assert_eq!(detect_freshness_column(&t).as_deref(), Some("recorded"));

        let none = table_with(vec![column("id", "INTEGER"), column("name", "VARCHAR")]);
        assert_eq!(detect_freshness_column(&none), None);
    }

    #[test]
    fn freshness_name_matching_avoids_substrings() {
        let t = table_with(vec![
            column("candidate_id", "INTEGER"),
            column("ship_date", "DATE"),
        ]);
        assert_eq!(detect_freshness_column(&t).as_deref(), Some("ship_date"));
    }

    #[test]
    fn numeric_type_detection() {
        assert!(is_numeric_type("INTEGER"));
        assert!(is_numeric_type("double precision"));
        assert!(is_numeric_type("DECIMAL(18,3)"));
        assert!(!is_numeric_type("VARCHAR"));
        assert!(!is_numeric_type("INTERVAL"));
        assert!(!is_numeric_type("TIMESTAMP"));
    }

    #[test]
    fn float_rendering_rejects_non_finite() {
        assert_eq!(sql_float(2.5).unwrap(), "(2.5)");
        assert_eq!(sql_float(-0.5).unwrap(), "(-0.5)");
        assert!(sql_float(f64::NAN).is_err());
        assert!(sql_float(f64::INFINITY).is_err());
    }
}
