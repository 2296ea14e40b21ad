//! Typed tabular results returned by every engine backend.
//!
//! Both backends materialize their wire formats into the same closed value
//! set at the adapter boundary, so callers never re-derive column positions
//! or coerce driver-specific types at each call site.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single cell value.
///
/// Values an engine cannot represent in this set (intervals, nested types)
/// are degraded to their text rendering by the backend that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    /// True when the cell was SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer value, if the cell holds one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as a float; integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text value, if the cell holds one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Boolean value, if the cell holds one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The materialized type of this value, for column descriptors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOLEAN",
            Self::Int(_) => "BIGINT",
            Self::Float(_) => "DOUBLE",
            Self::Text(_) => "VARCHAR",
        }
    }
}

/// Describes one result column.
///
/// `type_name` is the type the adapter materialized, which for the embedded
/// backend is derived from the returned data rather than the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDesc {
    pub name: String,
    pub type_name: String,
}

/// Columns plus rows, with name lookup resolved once at construction.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Vec<ColumnDesc>,
    rows: Vec<Vec<SqlValue>>,
    by_name: HashMap<String, usize>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnDesc>, rows: Vec<Vec<SqlValue>>) -> Self {
        let by_name = columns
            .iter()
            .enumerate()
            .map(|(idx, col)| (col.name.to_ascii_lowercase(), idx))
            .collect();
        Self {
            columns,
            rows,
            by_name,
        }
    }

    pub fn columns(&self) -> &[ColumnDesc] {
        &self.columns
    }

    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Option<RowView<'_>> {
        self.rows.get(idx).map(|values| RowView {
            result: self,
            values,
        })
    }

    pub fn first(&self) -> Option<RowView<'_>> {
        self.row(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().map(move |values| RowView {
            result: self,
            values,
        })
    }

    /// First cell of the first row as an integer; `None` when absent.
    pub fn scalar_i64(&self) -> Option<i64> {
        self.rows.first().and_then(|r| r.first()).and_then(SqlValue::as_i64)
    }

    /// First cell of the first row as a float; `None` when absent or null.
    pub fn scalar_f64(&self) -> Option<f64> {
        self.rows.first().and_then(|r| r.first()).and_then(SqlValue::as_f64)
    }
}

/// A borrowed row with by-name typed accessors.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    result: &'a ResultSet,
    values: &'a [SqlValue],
}

impl<'a> RowView<'a> {
    /// Cell by column name; `None` when the column does not exist.
    pub fn value(&self, name: &str) -> Option<&'a SqlValue> {
        self.result
            .column_index(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Cell by position.
    pub fn value_at(&self, idx: usize) -> Option<&'a SqlValue> {
        self.values.get(idx)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(SqlValue::as_i64)
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(SqlValue::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.value(name).and_then(SqlValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.value(name).and_then(SqlValue::as_bool)
    }
}
