//! Filter clauses produced from partition dimensions, and their SQL rendering.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `(column, operator, literal)` comparison.
///
/// A list of clauses is a conjunction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Gte,
    Lt,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn sanitize_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

/// Quote an identifier with backticks, doubling any embedded backtick.
pub fn quote_identifier(s: &str) -> String {
    format!("`{}`", s.replace('`', "``"))
}

impl FilterClause {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// The clause as a `(column, operator, literal)` triple.
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.column, self.op.as_str(), &self.value)
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {} '{}'",
            quote_identifier(&self.column),
            self.op,
            sanitize_sql_string(&self.value)
        )
    }
}

/// Join clauses into a predicate fragment suitable for a query's base predicate.
///
/// Returns `None` when there is nothing to filter on.
pub fn filters_to_predicate(clauses: &[FilterClause]) -> Option<String> {
    if clauses.is_empty() {
        return None;
    }
    let parts: Vec<String> = clauses.iter().map(|c| c.to_sql()).collect();
    Some(parts.join(" AND "))
}
