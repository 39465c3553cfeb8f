//! ucread Core - partition filters and query construction
//!
//! This crate holds the I/O-free half of reading Unity Catalog tables:
//! - Partition dimensions to filter clauses
//! - `SELECT` construction, with an optional row cap
//! - Predicates for in-scope partition keys

pub mod error;
pub mod filter;
pub mod partition;
pub mod predicate;
pub mod query;

pub use error::CoreError;
pub use filter::{filters_to_predicate, FilterClause, FilterOp};
pub use partition::{
    partition_dimensions_to_filters, ColumnType, PartitionDimension, PartitionSpec, TableSchema,
    TimeWindow,
};
pub use predicate::partition_predicate;
pub use query::{form_query, QueryBuilder, TableQuery, DEBUG_ROW_LIMIT};
