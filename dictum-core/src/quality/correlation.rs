//! Pairwise Pearson correlation across a table's numeric columns.

use super::{is_numeric_type, numeric_expr, QualityAnalyzer};
use crate::error::CoreResult;
use crate::schema::TableSchema;
use crate::security::qualify;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

const SIGNIFICANT_THRESHOLD: f64 = 0.5;
const STRONG_THRESHOLD: f64 = 0.7;

/// Band for a reported pair: every reported pair is at least significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrength {
    Moderate,
    Strong,
}

/// One significant correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub column_a: String,
    pub column_b: String,
    pub coefficient: f64,
    /// Rows where both columns were non-null.
    pub sample_size: i64,
    pub strength: CorrelationStrength,
}

/// Correlation matrix and the pairs worth surfacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub table_name: String,
    /// Columns that entered the analysis.
    pub columns: Vec<String>,
    /// Symmetric matrix with a unit diagonal. A pair is absent when its
    /// coefficient was incomputable (under two overlapping values, or zero
    /// variance on either side).
    pub matrix: BTreeMap<String, BTreeMap<String, f64>>,
    /// Pairs with `|r|` above 0.5, strongest first.
    pub significant_pairs: Vec<CorrelationPair>,
    /// Set when fewer than two numeric columns were available.
    pub insufficient_data: bool,
}

fn strength_for(coefficient: f64) -> Option<CorrelationStrength> {
    let magnitude = coefficient.abs();
    if magnitude > STRONG_THRESHOLD {
        Some(CorrelationStrength::Strong)
    } else if magnitude > SIGNIFICANT_THRESHOLD {
        Some(CorrelationStrength::Moderate)
    } else {
        None
    }
}

impl QualityAnalyzer {
    /// Pearson correlation for every unordered pair of numeric columns.
    ///
    /// With `columns = None`, columns are auto-selected by declared numeric
    /// type. A pair whose query fails is skipped with a warning so the rest
    /// of the matrix still fills in.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn correlations(
        &self,
        table: &TableSchema,
        columns: Option<&[String]>,
    ) -> CoreResult<CorrelationReport> {
        let selected: Vec<String> = match columns {
            Some(explicit) => explicit.to_vec(),
            None => table
                .columns
                .iter()
                .filter(|c| is_numeric_type(&c.data_type))
                .map(|c| c.name.clone())
                .collect(),
        };

        let mut matrix: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for column in &selected {
            matrix
                .entry(column.clone())
                .or_default()
                .insert(column.clone(), 1.0);
        }

        let mut report = CorrelationReport {
            table_name: table.table_name.clone(),
            columns: selected.clone(),
            matrix,
            significant_pairs: Vec::new(),
            insufficient_data: selected.len() < 2,
        };
        if report.insufficient_data {
            return Ok(report);
        }

        let target = qualify(&table.schema_name, &table.table_name)?;
        for (i, a) in selected.iter().enumerate() {
            for b in selected.iter().skip(i + 1) {
                let sql = format!(
                    "SELECT \
                         CORR({xa}, {xb}) AS coefficient, \
                         REGR_COUNT({xa}, {xb}) AS sample_size \
                     FROM {target}",
                    xa = numeric_expr(a)?,
                    xb = numeric_expr(b)?
                );
                let rs = match self.engine().execute(&sql).await {
                    Ok(rs) => rs,
                    Err(error) => {
                        warn!(column_a = %a, column_b = %b, %error, "correlation pair skipped");
                        continue;
                    }
                };
                let row = match rs.first() {
                    Some(row) => row,
                    None => continue,
                };
                let Some(coefficient) = row.get_f64("coefficient") else {
                    continue;
                };
                let coefficient = coefficient.clamp(-1.0, 1.0);
                let sample_size = row.get_f64("sample_size").unwrap_or(0.0) as i64;

                report
                    .matrix
                    .entry(a.clone())
                    .or_default()
                    .insert(b.clone(), coefficient);
                report
                    .matrix
                    .entry(b.clone())
                    .or_default()
                    .insert(a.clone(), coefficient);

                if let Some(strength) = strength_for(coefficient) {
                    report.significant_pairs.push(CorrelationPair {
                        column_a: a.clone(),
                        column_b: b.clone(),
                        coefficient,
                        sample_size,
                        strength,
                    });
                }
            }
        }

        report
            .significant_pairs
            .sort_by(|x, y| {
                y.coefficient
                    .abs()
                    .partial_cmp(&x.coefficient.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        Ok(report)
    }
}
