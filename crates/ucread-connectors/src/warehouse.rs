//! Client seam for SQL warehouses: connect, execute, fetch everything as Arrow.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

use crate::error::ConnectorResult;

/// Parameters for opening a warehouse connection.
///
/// The access token is redacted in `Debug` output.
#[derive(Clone)]
pub struct ConnectOptions {
    pub server_hostname: String,
    /// Warehouse endpoint path, e.g. `/sql/1.0/warehouses/<id>`.
    pub http_path: String,
    pub access_token: String,
    /// Fetch results as Arrow chunks from cloud storage instead of inline.
    pub use_cloud_fetch: bool,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("server_hostname", &self.server_hostname)
            .field("http_path", &self.http_path)
            .field("access_token", &"***")
            .field("use_cloud_fetch", &self.use_cloud_fetch)
            .finish()
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl ResultSet {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    /// Concatenate all batches into one. An empty result keeps its schema.
    pub fn into_batch(self) -> ConnectorResult<RecordBatch> {
        if self.batches.is_empty() {
            return Ok(RecordBatch::new_empty(self.schema));
        }
        let schema = self.batches[0].schema();
        Ok(arrow::compute::concat_batches(&schema, &self.batches)?)
    }
}

/// Opens sessions against a SQL warehouse.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    async fn connect(&self, options: ConnectOptions) -> ConnectorResult<Box<dyn WarehouseSession>>;
}

/// One open connection. Executes a statement, then hands back its full result.
#[async_trait]
pub trait WarehouseSession: Send {
    async fn execute(&mut self, sql: &str) -> ConnectorResult<()>;

    /// Pull the entire result of the last executed statement into memory.
    async fn fetch_all_arrow(&mut self) -> ConnectorResult<ResultSet>;
}
