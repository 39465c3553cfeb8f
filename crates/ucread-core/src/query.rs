//! SQL construction for table reads.
//!
//! Predicates are raw SQL fragments supplied by trusted callers and are
//! interpolated as-is. Do not feed user input through them.

use crate::filter::quote_identifier;

/// Row cap used by the debug builder.
pub const DEBUG_ROW_LIMIT: usize = 10_000;

/// Everything needed to build one `SELECT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableQuery {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    /// Empty means all columns.
    pub columns: Vec<String>,
    pub predicate: Option<String>,
    pub partition_predicate: Option<String>,
}

impl TableQuery {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_partition_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.partition_predicate = Some(predicate.into());
        self
    }

    fn where_predicate(&self) -> Option<String> {
        match (&self.predicate, &self.partition_predicate) {
            (Some(p), Some(pp)) => Some(format!("{} AND {}", p, pp)),
            (Some(p), None) => Some(p.clone()),
            (None, Some(pp)) => Some(pp.clone()),
            (None, None) => None,
        }
    }
}

/// Build the `SELECT` statement for a table read.
pub fn form_query(query: &TableQuery) -> String {
    let columns = if query.columns.is_empty() {
        "*".to_string()
    } else {
        query
            .columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let table_ref = format!(
        "{}.{}.{}",
        quote_identifier(&query.catalog),
        quote_identifier(&query.schema),
        quote_identifier(&query.table)
    );

    match query.where_predicate() {
        Some(predicate) => format!("SELECT {} FROM {} WHERE {}", columns, table_ref, predicate),
        None => format!("SELECT {} FROM {}", columns, table_ref),
    }
}

/// How a manager turns a [`TableQuery`] into SQL: the base builder, optionally
/// followed by a row cap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryBuilder {
    #[default]
    Standard,
    Limited(usize),
}

impl QueryBuilder {
    /// The limited builder used for debugging, capped at [`DEBUG_ROW_LIMIT`] rows.
    pub fn debug() -> Self {
        QueryBuilder::Limited(DEBUG_ROW_LIMIT)
    }

    pub fn build(&self, query: &TableQuery) -> String {
        let sql = form_query(query);
        match self {
            QueryBuilder::Standard => sql,
            QueryBuilder::Limited(limit) => append_limit(sql, *limit),
        }
    }
}

fn append_limit(sql: String, limit: usize) -> String {
    format!("{} LIMIT {}", sql, limit)
}
