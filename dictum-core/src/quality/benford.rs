//! Benford's-law leading-digit analysis.

use super::{numeric_expr, QualityAnalyzer};
use crate::error::CoreResult;
use crate::schema::TableSchema;
use crate::security::{escape_identifier, qualify};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Carried verbatim on every report.
pub const BENFORD_CAVEAT: &str =
    "Leading-digit analysis is a screening heuristic; deviation from the Benford \
     distribution is a signal worth investigating, not proof of fabricated data.";

/// Chi-square band edges for 8 degrees of freedom.
const CHI_SQUARE_LOW: f64 = 15.5;
const CHI_SQUARE_MODERATE: f64 = 20.1;

/// How suspicious the digit distribution looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Observed vs expected frequency for one leading digit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitFrequency {
    pub digit: u8,
    pub observed_count: i64,
    pub observed_frequency: f64,
    pub expected_frequency: f64,
}

/// Digit distribution of a numeric column's positive values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenfordReport {
    pub table_name: String,
    pub column_name: String,
    /// Positive values sampled.
    pub sample_size: i64,
    /// One entry per digit 1–9, even for digits never observed.
    pub digits: Vec<DigitFrequency>,
    pub chi_square: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub caveat: String,
    pub insufficient_data: bool,
}

/// `P(d) = log10(1 + 1/d)` for leading digit `d`.
fn expected_frequency(digit: u8) -> f64 {
    (1.0 + 1.0 / digit as f64).log10()
}

/// Chi-square statistic of observed digit counts against Benford.
fn chi_square(counts: &[i64; 9], total: i64) -> f64 {
    let total = total as f64;
    (1u8..=9)
        .map(|digit| {
            let expected = total * expected_frequency(digit);
            let observed = counts[digit as usize - 1] as f64;
            (observed - expected).powi(2) / expected
        })
        .sum()
}

fn risk_level(chi_square: f64) -> RiskLevel {
    if chi_square < CHI_SQUARE_LOW {
        RiskLevel::Low
    } else if chi_square < CHI_SQUARE_MODERATE {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

impl QualityAnalyzer {
    /// Compare a column's leading-digit distribution against Benford's law.
    ///
    /// The digit is extracted in SQL as the first `1–9` character of the
    /// text rendering of `ABS(x)`, which survives both plain and scientific
    /// notation. Only positive values participate.
    #[instrument(skip(self, table), fields(table = %table.table_name))]
    pub async fn benford(
        &self,
        table: &TableSchema,
        column: &str,
    ) -> CoreResult<BenfordReport> {
        let target = qualify(&table.schema_name, &table.table_name)?;
        let col = escape_identifier(column)?;
        let expr = numeric_expr(column)?;
        let sql = format!(
            "SELECT \
                 SUBSTRING(REGEXP_REPLACE(CAST(ABS({expr}) AS TEXT), '[^1-9]', '', 'g'), 1, 1) \
                     AS leading_digit, \
                 COUNT(*) AS digit_count \
             FROM {target} \
             WHERE {col} IS NOT NULL AND {expr} > 0 \
             GROUP BY 1"
        );
        let rs = self.engine().execute(&sql).await?;

        let mut counts = [0i64; 9];
        for row in rs.iter() {
            let digit = row
                .get_str("leading_digit")
                .and_then(|d| d.chars().next())
                .and_then(|c| c.to_digit(10));
            match digit {
                Some(d @ 1..=9) => counts[d as usize - 1] += row.get_i64("digit_count").unwrap_or(0),
                _ => warn!(column, "value with no significant digit skipped"),
            }
        }
        let sample_size: i64 = counts.iter().sum();

        let mut report = BenfordReport {
            table_name: table.table_name.clone(),
            column_name: column.to_string(),
            sample_size,
            digits: (1u8..=9)
                .map(|digit| DigitFrequency {
                    digit,
                    observed_count: counts[digit as usize - 1],
                    observed_frequency: counts[digit as usize - 1] as f64
                        / sample_size.max(1) as f64,
                    expected_frequency: expected_frequency(digit),
                })
                .collect(),
            chi_square: None,
            risk_level: None,
            caveat: BENFORD_CAVEAT.to_string(),
            insufficient_data: sample_size == 0,
        };
        if sample_size > 0 {
            let statistic = chi_square(&counts, sample_size);
            report.chi_square = Some(statistic);
            report.risk_level = Some(risk_level(statistic));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_frequencies_sum_to_one() {
        let sum: f64 = (1u8..=9).map(expected_frequency).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((expected_frequency(1) - 0.3010).abs() < 1e-4);
        assert!((expected_frequency(9) - 0.0458).abs() < 1e-4);
    }

    #[test]
    fn benford_conformant_counts_score_low() {
        let total = 100_000i64;
        let mut counts = [0i64; 9];
        for digit in 1u8..=9 {
            counts[digit as usize - 1] = (total as f64 * expected_frequency(digit)).round() as i64;
        }
        let total: i64 = counts.iter().sum();
        let statistic = chi_square(&counts, total);
        assert!(statistic < 1.0, "statistic was {statistic}");
        assert_eq!(risk_level(statistic), RiskLevel::Low);
    }

    #[test]
    fn single_digit_data_scores_high() {
        let mut counts = [0i64; 9];
        counts[8] = 10_000;
        let statistic = chi_square(&counts, 10_000);
        assert!(statistic > CHI_SQUARE_MODERATE);
        assert_eq!(risk_level(statistic), RiskLevel::High);
    }

    #[test]
    fn band_edges() {
        assert_eq!(risk_level(15.4), RiskLevel::Low);
        assert_eq!(risk_level(15.6), RiskLevel::Moderate);
        assert_eq!(risk_level(20.2), RiskLevel::High);
    }
}
