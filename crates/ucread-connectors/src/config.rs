//! Input manager configuration from environment variables.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::statement_api::StatementApiOptions;
use ucread_core::QueryBuilder;

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Workspace hostname, e.g. `adb-123.4.azuredatabricks.net`.
    pub server_hostname: String,
    /// Warehouse endpoint path, e.g. `/sql/1.0/warehouses/<id>`.
    pub http_path: String,
    pub poll_interval_ms: u64,
    pub wait_timeout_secs: u64,
    pub http_timeout_secs: Option<u64>,
    /// Cap every query at the debug row limit.
    pub debug_limit: bool,
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server_hostname: std::env::var("DATABRICKS_SERVER_HOSTNAME")
                .context("DATABRICKS_SERVER_HOSTNAME not set")?,
            http_path: std::env::var("DATABRICKS_HTTP_PATH")
                .context("DATABRICKS_HTTP_PATH not set")?,
            poll_interval_ms: std::env::var("UCREAD_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .context("Invalid UCREAD_POLL_INTERVAL_MS")?,
            wait_timeout_secs: std::env::var("UCREAD_WAIT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Invalid UCREAD_WAIT_TIMEOUT_SECS")?,
            http_timeout_secs: std::env::var("UCREAD_HTTP_TIMEOUT_SECS")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("Invalid UCREAD_HTTP_TIMEOUT_SECS")?,
            debug_limit: std::env::var("UCREAD_DEBUG_LIMIT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        anyhow::ensure!(
            config.wait_timeout_secs == 0 || (5..=50).contains(&config.wait_timeout_secs),
            "UCREAD_WAIT_TIMEOUT_SECS must be 0 or between 5 and 50, got {}",
            config.wait_timeout_secs
        );
        Ok(config)
    }

    pub fn statement_options(&self) -> StatementApiOptions {
        StatementApiOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            wait_timeout_secs: self.wait_timeout_secs,
            request_timeout: self.http_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn query_builder(&self) -> QueryBuilder {
        if self.debug_limit {
            QueryBuilder::debug()
        } else {
            QueryBuilder::Standard
        }
    }
}
