//! Input manager that reads Unity Catalog tables through a SQL warehouse.
//!
//! Table coordinates come from the upstream output's metadata (`catalog`,
//! `schema`, `table`); `columns`, `predicate` and `partition_expr` may be set
//! on either side, with the current input winning. The whole result is pulled
//! into memory, so callers are expected to narrow reads with predicates or
//! partitions.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use datafusion::prelude::{DataFrame, SessionContext};
use tracing::info;
use ucread_core::{partition_predicate, QueryBuilder, TableQuery};

use crate::config::WarehouseConfig;
use crate::context::{optional_str, required_str, string_list, InputContext};
use crate::error::{ConnectorError, ConnectorResult};
use crate::statement_api::StatementApiClient;
use crate::token::TokenProvider;
use crate::warehouse::{ConnectOptions, WarehouseClient};

/// Reads a table through a SQL warehouse and returns it as one Arrow batch.
///
/// Read-only: [`handle_output`](Self::handle_output) always fails.
pub struct UnityCatalogInputManager {
    tokens: Arc<dyn TokenProvider>,
    server_hostname: String,
    endpoint: String,
    builder: QueryBuilder,
    client: Arc<dyn WarehouseClient>,
}

impl std::fmt::Debug for UnityCatalogInputManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnityCatalogInputManager")
            .field("server_hostname", &self.server_hostname)
            .field("endpoint", &self.endpoint)
            .field("builder", &self.builder)
            .finish()
    }
}

impl UnityCatalogInputManager {
    /// Create a manager backed by the Statement Execution API.
    ///
    /// `tokens` is called once per read and must not return a cached token.
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        server_hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> ConnectorResult<Self> {
        let client = StatementApiClient::new(Default::default())?;
        Ok(Self {
            tokens,
            server_hostname: server_hostname.into(),
            endpoint: endpoint.into(),
            builder: QueryBuilder::Standard,
            client: Arc::new(client),
        })
    }

    /// Same as [`new`](Self::new) but every query is capped at the debug row limit.
    pub fn debug(
        tokens: Arc<dyn TokenProvider>,
        server_hostname: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> ConnectorResult<Self> {
        Ok(Self::new(tokens, server_hostname, endpoint)?.with_builder(QueryBuilder::debug()))
    }

    pub fn from_config(
        config: &WarehouseConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> ConnectorResult<Self> {
        let client = StatementApiClient::new(config.statement_options())?;
        Ok(Self {
            tokens,
            server_hostname: config.server_hostname.clone(),
            endpoint: config.http_path.clone(),
            builder: config.query_builder(),
            client: Arc::new(client),
        })
    }

    pub fn with_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_client(mut self, client: Arc<dyn WarehouseClient>) -> Self {
        self.client = client;
        self
    }

    pub fn builder(&self) -> QueryBuilder {
        self.builder
    }

    /// Resolve the read context into the SQL this manager would run.
    ///
    /// Fails on missing table coordinates without touching the network.
    pub fn build_query(&self, context: &InputContext) -> ConnectorResult<String> {
        let upstream = context
            .upstream_output
            .as_ref()
            .ok_or(ConnectorError::MissingUpstream)?;

        let table = required_str(upstream, "table")?;
        let schema = required_str(upstream, "schema")?;
        let catalog = required_str(upstream, "catalog")?;

        let metadata = context.merged_metadata();
        let columns = string_list(&metadata, "columns")?;
        let predicate = optional_str(&metadata, "predicate")?;

        let partition = match &context.asset_partitions {
            Some(keys) => {
                let partition_expr = required_str(&metadata, "partition_expr")?;
                partition_predicate(&partition_expr, keys)
            }
            None => None,
        };

        let query = TableQuery {
            catalog,
            schema,
            table,
            columns,
            predicate,
            partition_predicate: partition,
        };
        Ok(self.builder.build(&query))
    }

    /// Read the table described by `context` into a single batch.
    pub async fn load_input(&self, context: &InputContext) -> ConnectorResult<RecordBatch> {
        let query = self.build_query(context)?;
        self.read_table(&query).await
    }

    /// Like [`load_input`](Self::load_input), wrapped as a DataFusion `DataFrame`.
    pub async fn load_dataframe(
        &self,
        context: &InputContext,
        ctx: &SessionContext,
    ) -> ConnectorResult<DataFrame> {
        let batch = self.load_input(context).await?;
        Ok(ctx.read_batch(batch)?)
    }

    /// Writing through this manager is not supported.
    pub fn handle_output(
        &self,
        _context: &InputContext,
        _batch: &RecordBatch,
    ) -> ConnectorResult<()> {
        Err(ConnectorError::Unsupported(
            "Currently this input manager only supports reading data, handling outputs is not supported"
                .to_string(),
        ))
    }

    async fn read_table(&self, query: &str) -> ConnectorResult<RecordBatch> {
        let access_token = self
            .tokens
            .token()
            .map_err(|e| ConnectorError::Token(e.to_string()))?;

        let mut session = self
            .client
            .connect(ConnectOptions {
                server_hostname: self.server_hostname.clone(),
                http_path: self.endpoint.clone(),
                access_token,
                use_cloud_fetch: true,
            })
            .await?;

        info!(
            "Executing query: {} on dbw: {} with sqlwh: {}",
            query, self.server_hostname, self.endpoint
        );
        session.execute(query).await?;

        let result = session.fetch_all_arrow().await?;
        info!("Fetched {} row(s) in {} batch(es)", result.num_rows(), result.batches.len());
        result.into_batch()
    }
}
