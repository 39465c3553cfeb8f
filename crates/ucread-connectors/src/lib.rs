//! ucread Connectors - SQL warehouse input managers
//!
//! This crate reads Unity Catalog tables through a SQL warehouse:
//! - Read context and metadata resolution
//! - Token generators (fresh credential per read)
//! - A client seam for warehouses, with a Statement Execution API client
//! - The input manager and its row-capped debug variant

pub mod config;
pub mod context;
pub mod error;
pub mod input_manager;
pub mod statement_api;
pub mod token;
pub mod type_mapping;
pub mod warehouse;

pub use config::WarehouseConfig;
pub use context::{InputContext, Metadata, PartitionSubset};
pub use error::{ConnectorError, ConnectorResult};
pub use input_manager::UnityCatalogInputManager;
pub use statement_api::{StatementApiClient, StatementApiOptions};
pub use token::{EnvTokenProvider, TokenProvider};
pub use warehouse::{ConnectOptions, ResultSet, WarehouseClient, WarehouseSession};

/// Serializes tests that read or mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
