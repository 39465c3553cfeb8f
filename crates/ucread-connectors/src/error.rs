//! Typed errors for the connectors crate.

use thiserror::Error;
use ucread_core::CoreError;

/// Errors that can occur while reading a table through a SQL warehouse.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The read context has no upstream output to take table metadata from.
    #[error("upstream_output should not be empty")]
    MissingUpstream,
    /// A required metadata key is absent, null, or empty.
    #[error("{0} not present in metadata")]
    MissingMetadata(String),
    /// A metadata key holds a value of the wrong shape.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),
    /// The operation is not offered by this manager.
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    /// The token generator failed to produce a credential.
    #[error("token generation failed: {0}")]
    Token(String),
    /// Failed to reach the warehouse.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The warehouse rejected the credential.
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// The statement failed or the warehouse returned an error.
    #[error("query failed: {0}")]
    QueryFailed(String),
    /// The result set could not be decoded into Arrow.
    #[error("decode failed: {0}")]
    Decode(String),
    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    ConfigError(String),
    #[error(transparent)]
    Partition(#[from] CoreError),
}

impl From<anyhow::Error> for ConnectorError {
    fn from(e: anyhow::Error) -> Self {
        ConnectorError::QueryFailed(e.to_string())
    }
}

impl From<reqwest::Error> for ConnectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ConnectorError::Decode(e.to_string())
        } else {
            ConnectorError::ConnectionFailed(e.to_string())
        }
    }
}

impl From<arrow::error::ArrowError> for ConnectorError {
    fn from(e: arrow::error::ArrowError) -> Self {
        ConnectorError::Decode(e.to_string())
    }
}

impl From<datafusion::error::DataFusionError> for ConnectorError {
    fn from(e: datafusion::error::DataFusionError) -> Self {
        ConnectorError::QueryFailed(e.to_string())
    }
}

pub type ConnectorResult<T> = Result<T, ConnectorError>;
