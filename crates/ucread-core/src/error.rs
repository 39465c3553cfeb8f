//! Typed errors for the core crate.

use thiserror::Error;

/// Errors raised while translating partition metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The partition column is not part of the table schema.
    #[error("partition column '{0}' not found in table schema")]
    ColumnNotFound(String),

    /// Time-window partitions need a date or timestamp column.
    #[error("unsupported partition column type '{type_name}' for column '{column}', expected date or timestamp")]
    UnsupportedPartitionType { column: String, type_name: String },
}
