//! Translate partition dimensions into filter clauses.
//!
//! Time-window partitions are lowered to literals according to the declared
//! type of the partition column: `YYYY-MM-DD HH:MM:SS` for timestamps and
//! `YYYY-MM-DD` for dates.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::filter::{FilterClause, FilterOp};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A half-open `[start, end)` time window in the partition's wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSpec {
    TimeWindow(TimeWindow),
    Value(String),
}

/// A partition column together with the slice of it being read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionDimension {
    pub partition_expr: String,
    pub partitions: PartitionSpec,
}

impl PartitionDimension {
    pub fn time_window(partition_expr: impl Into<String>, window: TimeWindow) -> Self {
        Self {
            partition_expr: partition_expr.into(),
            partitions: PartitionSpec::TimeWindow(window),
        }
    }

    pub fn value(partition_expr: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            partition_expr: partition_expr.into(),
            partitions: PartitionSpec::Value(value.into()),
        }
    }
}

/// Declared column type, as far as partition translation cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Date,
    Timestamp,
    Other(String),
}

impl ColumnType {
    /// Parse a primitive type name (case-insensitive).
    pub fn parse(type_name: &str) -> Self {
        match type_name.to_lowercase().as_str() {
            "string" => ColumnType::String,
            "date" => ColumnType::Date,
            "timestamp" | "timestamp_ntz" => ColumnType::Timestamp,
            other => ColumnType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ColumnType::String => "string",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Other(name) => name,
        }
    }
}

/// Column name to declared type lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    fields: Vec<(String, ColumnType)>,
}

impl TableSchema {
    pub fn new(fields: Vec<(String, ColumnType)>) -> Self {
        Self { fields }
    }

    /// Build a schema from `(name, type_name)` pairs.
    pub fn from_type_names<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ColumnType::parse(ty)))
                .collect(),
        }
    }

    pub fn column_type(&self, name: &str) -> Option<&ColumnType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }
}

fn format_instant(
    column: &str,
    column_type: &ColumnType,
    instant: &NaiveDateTime,
) -> Result<String, CoreError> {
    match column_type {
        ColumnType::Timestamp => Ok(instant.format(TIMESTAMP_FORMAT).to_string()),
        ColumnType::Date => Ok(instant.format(DATE_FORMAT).to_string()),
        other => Err(CoreError::UnsupportedPartitionType {
            column: column.to_string(),
            type_name: other.name().to_string(),
        }),
    }
}

/// Translate partition dimensions into a list of filter clauses.
///
/// With `single_value` set, a time window becomes one equality clause against
/// its start; this is the exact-match convention for single-partition reads.
/// Otherwise the window becomes a `>= start` and `< end` pair, so in range
/// mode a window dimension yields two clauses and the output can be longer
/// than `dimensions`.
pub fn partition_dimensions_to_filters(
    dimensions: &[PartitionDimension],
    schema: &TableSchema,
    single_value: bool,
) -> Result<Vec<FilterClause>, CoreError> {
    let mut clauses = Vec::with_capacity(dimensions.len());

    for dimension in dimensions {
        let column = dimension.partition_expr.as_str();
        let column_type = schema
            .column_type(column)
            .ok_or_else(|| CoreError::ColumnNotFound(column.to_string()))?;

        match &dimension.partitions {
            PartitionSpec::TimeWindow(window) => {
                let start = format_instant(column, column_type, &window.start)?;
                if single_value {
                    clauses.push(FilterClause::new(column, FilterOp::Eq, start));
                } else {
                    let end = format_instant(column, column_type, &window.end)?;
                    clauses.push(FilterClause::new(column, FilterOp::Gte, start));
                    clauses.push(FilterClause::new(column, FilterOp::Lt, end));
                }
            }
            PartitionSpec::Value(value) => {
                clauses.push(FilterClause::new(column, FilterOp::Eq, value.clone()));
            }
        }
    }

    debug!("Translated {} partition dimension(s) into {} clause(s)", dimensions.len(), clauses.len());
    Ok(clauses)
}
