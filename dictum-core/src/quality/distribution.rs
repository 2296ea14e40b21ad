//! Distribution shape analysis: percentiles, central moments, and their
//! interpretation bands.

use super::{numeric_expr, sql_float, QualityAnalyzer};
use crate::error::{CoreError, CoreResult};
use crate::schema::TableSchema;
use crate::security::qualify;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Shape statistics for one numeric column.
///
/// `skewness` is `E[(x−μ)³]/σ³` and `kurtosis` is the excess form
/// `E[(x−μ)⁴]/σ⁴ − 3`; both stay `None` for constant columns, where the
/// denominators vanish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub table_name: String,
    pub column_name: String,
    pub sample_size: i64,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Population variance.
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub skewness_label: Option<String>,
    pub kurtosis_label: Option<String>,
    pub insufficient_data: bool,
}

impl DistributionReport {
    fn empty(table: &TableSchema, column: &str, sample_size: i64) -> Self {
        Self {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            sample_size,
            mean: None,
            median: None,
            variance: None,
            std_dev: None,
            p10: None,
            p25: None,
            p50: None,
            p75: None,
            p90: None,
            skewness: None,
            kurtosis: None,
            skewness_label: None,
            kurtosis_label: None,
            insufficient_data: true,
        }
    }
}

/// Population variance, stddev, skewness, and excess kurtosis from the raw
/// central moment sums.
fn shape_from_moments(
    n: f64,
    m2: f64,
    m3: f64,
    m4: f64,
) -> (f64, f64, Option<f64>, Option<f64>) {
    let variance = m2 / n;
    let std_dev = variance.sqrt();
    if std_dev == 0.0 {
        return (variance, std_dev, None, None);
    }
    let skewness = (m3 / n) / std_dev.powi(3);
    let kurtosis = (m4 / n) / std_dev.powi(4) - 3.0;
    (variance, std_dev, Some(skewness), Some(kurtosis))
}

fn classify_skewness(value: f64) -> String {
    let direction = if value >= 0.0 { "right" } else { "left" };
    let magnitude = value.abs();
    if magnitude < 0.5 {
        "symmetric".to_string()
    } else if magnitude < 1.0 {
        format!("moderately {direction}-skewed")
    } else {
        format!("highly {direction}-skewed")
    }
}

fn classify_kurtosis(value: f64) -> &'static str {
    if value.abs() < 1.0 {
        "mesokurtic"
    } else if value > 1.0 {
        "leptokurtic (heavy-tailed)"
    } else {
        "platykurtic (light-tailed)"
    }
}

impl QualityAnalyzer {
    /// Describe the distribution of a numeric column.
    ///
    /// Pass one collects the mean and percentiles; pass two sums the
    /// second/third/fourth central moments around that mean. Fewer than two
    /// usable values yields an `insufficient_data` report.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn distribution(
        &self,
        table: &TableSchema,
        column: &str,
    ) -> CoreResult<DistributionReport> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let expr = numeric_expr(column)?;

        let summary_sql = format!(
            "SELECT \
                 COUNT({expr}) AS sample_size, \
                 AVG({expr}) AS mean_value, \
                 PERCENTILE_CONT(0.1) WITHIN GROUP (ORDER BY {expr}) AS p10, \
                 PERCENTILE_CONT(0.25) WITHIN GROUP (ORDER BY {expr}) AS p25, \
                 PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {expr}) AS p50, \
                 PERCENTILE_CONT(0.75) WITHIN GROUP (ORDER BY {expr}) AS p75, \
                 PERCENTILE_CONT(0.9) WITHIN GROUP (ORDER BY {expr}) AS p90 \
             FROM {target}"
        );
        let rs = self.engine().execute(&summary_sql).await?;
        let row = rs
            .first()
            .ok_or_else(|| CoreError::query_failed(&summary_sql, "aggregate returned no rows"))?;
        let sample_size = row.get_i64("sample_size").unwrap_or(0);
        if sample_size < 2 {
            return Ok(DistributionReport::empty(table, column, sample_size));
        }
        let mean = row
            .get_f64("mean_value")
            .ok_or_else(|| CoreError::query_failed(&summary_sql, "mean missing for non-empty column"))?;

        let moments_sql = format!(
            "SELECT \
                 SUM(POWER({expr} - {mu}, 2)) AS m2, \
                 SUM(POWER({expr} - {mu}, 3)) AS m3, \
                 SUM(POWER({expr} - {mu}, 4)) AS m4 \
             FROM {target}",
            mu = sql_float(mean)?
        );
        let moments = self.engine().execute(&moments_sql).await?;
        let mrow = moments
            .first()
            .ok_or_else(|| CoreError::query_failed(&moments_sql, "aggregate returned no rows"))?;
        let m2 = mrow.get_f64("m2").unwrap_or(0.0);
        let m3 = mrow.get_f64("m3").unwrap_or(0.0);
        let m4 = mrow.get_f64("m4").unwrap_or(0.0);

        let (variance, std_dev, skewness, kurtosis) =
            shape_from_moments(sample_size as f64, m2, m3, m4);

        Ok(DistributionReport {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            sample_size,
            mean: Some(mean),
            median: row.get_f64("p50"),
            variance: Some(variance),
            std_dev: Some(std_dev),
            p10: row.get_f64("p10"),
            p25: row.get_f64("p25"),
            p50: row.get_f64("p50"),
            p75: row.get_f64("p75"),
            p90: row.get_f64("p90"),
            skewness,
            kurtosis,
            skewness_label: skewness.map(classify_skewness),
            kurtosis_label: kurtosis.map(|k| classify_kurtosis(k).to_string()),
            insufficient_data: false,
        })
    }
}
