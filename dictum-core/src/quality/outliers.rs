//! Outlier detection, z-score and IQR flavors.

use super::{numeric_expr, sql_float, QualityAnalyzer};
use crate::error::{CoreError, CoreResult};
use crate::schema::TableSchema;
use crate::security::qualify;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which detection method to run, with its tuning parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Flag values with `|x − μ| / σ` above the threshold.
    ZScore { threshold: f64 },
    /// Flag values outside `[Q1 − k·IQR, Q3 + k·IQR]`.
    Iqr { multiplier: f64 },
}

impl OutlierMethod {
    /// Z-score with the conventional threshold of 3.0.
    pub fn z_score() -> Self {
        Self::ZScore { threshold: 3.0 }
    }

    /// IQR with the conventional multiplier of 1.5.
    pub fn iqr() -> Self {
        Self::Iqr { multiplier: 1.5 }
    }
}

impl Default for OutlierMethod {
    fn default() -> Self {
        Self::z_score()
    }
}

/// Result of one outlier scan. Fields irrelevant to the chosen method stay
/// `None` (`q1`/`q3`/bounds for z-score, `mean`/`std_dev` for IQR).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub table_name: String,
    pub column_name: String,
    pub method: OutlierMethod,
    /// Non-null values considered.
    pub sample_size: i64,
    pub outlier_count: i64,
    pub outlier_rate: f64,
    pub mean: Option<f64>,
    /// Population standard deviation.
    pub std_dev: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
    pub lower_bound: Option<f64>,
    pub upper_bound: Option<f64>,
    /// Set when σ = 0 made z-scores undefined; zero outliers are reported.
    pub no_variance: bool,
    /// Set when there were no usable values at all.
    pub insufficient_data: bool,
}

impl OutlierReport {
    fn empty(table: &TableSchema, column: &str, method: OutlierMethod) -> Self {
        Self {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            method,
            sample_size: 0,
            outlier_count: 0,
            outlier_rate: 0.0,
            mean: None,
            std_dev: None,
            q1: None,
            q3: None,
            lower_bound: None,
            upper_bound: None,
            no_variance: false,
            insufficient_data: true,
        }
    }
}

/// IQR fence positions for given quartiles.
fn iqr_bounds(q1: f64, q3: f64, multiplier: f64) -> (f64, f64) {
    let iqr = q3 - q1;
    (q1 - multiplier * iqr, q3 + multiplier * iqr)
}

impl QualityAnalyzer {
    /// Count outlying values of a numeric column.
    ///
    /// Two aggregation passes: one for the location/spread statistics, one
    /// counting values beyond them.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn outliers(
        &self,
        table: &TableSchema,
        column: &str,
        method: OutlierMethod,
    ) -> CoreResult<OutlierReport> {
        match method {
            OutlierMethod::ZScore { threshold } => {
                self.z_score_outliers(table, column, threshold).await
            }
            OutlierMethod::Iqr { multiplier } => {
                self.iqr_outliers(table, column, multiplier).await
            }
        }
    }

    async fn z_score_outliers(
        &self,
        table: &TableSchema,
        column: &str,
        threshold: f64,
    ) -> CoreResult<OutlierReport> {
        let method = OutlierMethod::ZScore { threshold };
        let target = qualify(&table.schema_name, &table.table_name)?;
        let expr = numeric_expr(column)?;

        let stats_sql = format!(
            "SELECT \
                 COUNT({expr}) AS sample_size, \
                 AVG({expr}) AS mean_value, \
                 STDDEV_POP({expr}) AS std_dev \
             FROM {target}"
        );
        let rs = self.engine().execute(&stats_sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&stats_sql, "aggregate returned no rows"))?;
        let sample_size = row.get_i64("sample_size").unwrap_or(0);
        let (Some(mean), Some(std_dev)) = (row.get_f64("mean_value"), row.get_f64("std_dev"))
        else {
            return Ok(OutlierReport::empty(table, column, method));
        };

        if std_dev == 0.0 {
            return Ok(OutlierReport {
                sample_size,
                mean: Some(mean),
                std_dev: Some(0.0),
                no_variance: true,
                insufficient_data: false,
                ..OutlierReport::empty(table, column, method)
            });
        }

        let count_sql = format!(
            "SELECT COUNT(*) FILTER (WHERE ABS({expr} - {mu}) > {t} * {sigma}) AS outlier_count \
             FROM {target}",
            mu = sql_float(mean)?,
            t = sql_float(threshold)?,
            sigma = sql_float(std_dev)?
        );
        let outlier_count = self
            .engine()
            .execute(&count_sql)
            .await?
            .scalar_i64()
            .unwrap_or(0);

        Ok(OutlierReport {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            method,
            sample_size,
            outlier_count,
            outlier_rate: outlier_count as f64 / sample_size.max(1) as f64,
            mean: Some(mean),
            std_dev: Some(std_dev),
            q1: None,
            q3: None,
            lower_bound: None,
            upper_bound: None,
            no_variance: false,
            insufficient_data: false,
        })
    }

    async fn iqr_outliers(
        &self,
        table: &TableSchema,
        column: &str,
        multiplier: f64,
    ) -> CoreResult<OutlierReport> {
        let method = OutlierMethod::Iqr { multiplier };
        let target = qualify(&table.schema_name, &table.table_name)?;
        let expr = numeric_expr(column)?;

        let quartile_sql = format!(
            "SELECT \
                 COUNT({expr}) AS sample_size, \
                 PERCENTILE_CONT(0.25) WITHIN GROUP (ORDER BY {expr}) AS q1, \
                 PERCENTILE_CONT(0.75) WITHIN GROUP (ORDER BY {expr}) AS q3 \
             FROM {target}"
        );
        let rs = self.engine().execute(&quartile_sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&quartile_sql, "aggregate returned no rows"))?;
        let sample_size = row.get_i64("sample_size").unwrap_or(0);
        let (Some(q1), Some(q3)) = (row.get_f64("q1"), row.get_f64("q3")) else {
            return Ok(OutlierReport::empty(table, column, method));
        };

        let (lower_bound, upper_bound) = iqr_bounds(q1, q3, multiplier);
        let count_sql = format!(
            "SELECT COUNT(*) FILTER (WHERE {expr} < {lo} OR {expr} > {hi}) AS outlier_count \
             FROM {target}",
            lo = sql_float(lower_bound)?,
            hi = sql_float(upper_bound)?
        );
        let outlier_count = self
            .engine()
            .execute(&count_sql)
            .await?
            .scalar_i64()
            .unwrap_or(0);

        Ok(OutlierReport {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            method,
            sample_size,
            outlier_count,
            outlier_rate: outlier_count as f64 / sample_size.max(1) as f64,
            mean: None,
            std_dev: None,
            q1: Some(q1),
            q3: Some(q3),
            lower_bound: Some(lower_bound),
            upper_bound: Some(upper_bound),
            no_variance: false,
            insufficient_data: false,
        })
    }
}
