//! Warehouse client over the Databricks SQL Statement Execution API.
//!
//! A statement is submitted with `POST /api/2.0/sql/statements/`, polled until
//! it reaches a terminal state, and its result chunks are then walked in
//! order. With cloud fetch enabled chunks arrive as Arrow IPC streams behind
//! pre-signed links; otherwise rows come inline as JSON and are cast to the
//! manifest's column types.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use arrow::array::{ArrayRef, BinaryArray, StringArray};
use arrow::compute::CastOptions;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::ipc::reader::StreamReader;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as base64_engine, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{ConnectorError, ConnectorResult};
use crate::type_mapping::warehouse_type_to_arrow;
use crate::warehouse::{ConnectOptions, ResultSet, WarehouseClient, WarehouseSession};

const STATEMENTS_PATH: &str = "/api/2.0/sql/statements/";

/// Tuning for statement submission and polling.
#[derive(Debug, Clone)]
pub struct StatementApiOptions {
    /// Delay between status polls while a statement is pending or running.
    pub poll_interval: Duration,
    /// Seconds the server may block on submit before answering; `0` or `5..=50`.
    pub wait_timeout_secs: u64,
    /// Per-request HTTP timeout. `None` keeps the client default.
    pub request_timeout: Option<Duration>,
}

impl Default for StatementApiOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            wait_timeout_secs: 10,
            request_timeout: None,
        }
    }
}

/// [`WarehouseClient`] backed by the Statement Execution REST API.
#[derive(Debug, Clone)]
pub struct StatementApiClient {
    options: StatementApiOptions,
    http: reqwest::Client,
}

impl StatementApiClient {
    pub fn new(options: StatementApiOptions) -> ConnectorResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            ConnectorError::ConfigError(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Self { options, http })
    }
}

#[async_trait]
impl WarehouseClient for StatementApiClient {
    async fn connect(&self, options: ConnectOptions) -> ConnectorResult<Box<dyn WarehouseSession>> {
        let base_url = base_url(&options.server_hostname)?;
        let warehouse_id = warehouse_id(&options.http_path)?;
        debug!(
            "Opening statement session on {} for warehouse {}",
            base_url, warehouse_id
        );
        Ok(Box::new(StatementSession {
            http: self.http.clone(),
            options: self.options.clone(),
            base_url,
            warehouse_id,
            access_token: options.access_token,
            use_cloud_fetch: options.use_cloud_fetch,
            finished: None,
        }))
    }
}

/// Resolve the API base URL from a server hostname.
///
/// Bare hostnames get `https://`; a value that already has a scheme is kept.
pub fn base_url(server_hostname: &str) -> ConnectorResult<String> {
    let host = server_hostname.trim();
    if host.is_empty() {
        return Err(ConnectorError::ConfigError("server hostname is empty".to_string()));
    }
    let raw = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    let url = Url::parse(&raw)
        .map_err(|e| ConnectorError::ConfigError(format!("invalid server hostname '{}': {}", host, e)))?;
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Extract the warehouse id from an endpoint path such as
/// `/sql/1.0/warehouses/<id>`. A bare id is accepted as-is.
pub fn warehouse_id(http_path: &str) -> ConnectorResult<String> {
    http_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_string)
        .ok_or_else(|| {
            ConnectorError::ConfigError(format!("no warehouse id in endpoint '{}'", http_path))
        })
}

// ---- Serde models for Statement Execution API JSON ----

#[derive(Serialize)]
struct ExecuteStatementRequest<'a> {
    statement: &'a str,
    warehouse_id: &'a str,
    wait_timeout: String,
    on_wait_timeout: &'static str,
    disposition: &'static str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    manifest: Option<ResultManifest>,
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: StatementState,
    error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

impl StatementState {
    fn is_terminal(&self) -> bool {
        !matches!(self, StatementState::Pending | StatementState::Running)
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultManifest {
    schema: Option<ManifestSchema>,
    total_chunk_count: Option<u64>,
    total_row_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ManifestSchema {
    #[serde(default)]
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
    type_name: String,
    type_text: Option<String>,
    #[serde(default)]
    position: i32,
}

#[derive(Debug, Default, Deserialize)]
struct ResultData {
    chunk_index: Option<u64>,
    #[serde(default)]
    external_links: Vec<ExternalLink>,
    data_array: Option<Vec<Vec<Option<String>>>>,
    next_chunk_internal_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalLink {
    external_link: String,
    chunk_index: Option<u64>,
    next_chunk_internal_link: Option<String>,
}

impl ResultData {
    fn next_link(&self) -> Option<String> {
        self.next_chunk_internal_link.clone().or_else(|| {
            self.external_links
                .last()
                .and_then(|link| link.next_chunk_internal_link.clone())
        })
    }
}

fn manifest_schema(manifest: Option<&ResultManifest>) -> SchemaRef {
    let mut columns: Vec<&ManifestColumn> = manifest
        .and_then(|m| m.schema.as_ref())
        .map(|s| s.columns.iter().collect())
        .unwrap_or_default();
    columns.sort_by_key(|c| c.position);

    let fields: Vec<Field> = columns
        .iter()
        .map(|c| {
            Field::new(
                &c.name,
                warehouse_type_to_arrow(&c.type_name, c.type_text.as_deref()),
                true,
            )
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn failure_message(status: &StatementStatus) -> String {
    match &status.error {
        Some(ServiceError {
            error_code,
            message,
        }) => format!(
            "statement {:?}: {} ({})",
            status.state,
            message.as_deref().unwrap_or("no message"),
            error_code.as_deref().unwrap_or("UNKNOWN")
        ),
        None => format!("statement {:?}", status.state),
    }
}

/// Build a batch from inline JSON rows, casting each column to its target type.
///
/// Casts are strict: a value that does not parse or overflows its column type
/// fails the whole batch instead of becoming null.
fn json_rows_to_batch(
    rows: &[Vec<Option<String>>],
    schema: &SchemaRef,
) -> ConnectorResult<RecordBatch> {
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
    let cast_options = CastOptions {
        safe: false,
        ..Default::default()
    };

    for (i, field) in schema.fields().iter().enumerate() {
        let values = rows.iter().map(|row| row.get(i).cloned().flatten());
        let array: ArrayRef = match field.data_type() {
            DataType::Utf8 => Arc::new(values.collect::<StringArray>()),
            // Inline BINARY values arrive base64-encoded.
            DataType::Binary => Arc::new(decode_base64_column(field.name(), values)?),
            other => {
                let strings: ArrayRef = Arc::new(values.collect::<StringArray>());
                arrow::compute::cast_with_options(&strings, other, &cast_options)
                    .map_err(|e| {
                        ConnectorError::Decode(format!("column '{}': {}", field.name(), e))
                    })?
            }
        };
        columns.push(array);
    }

    Ok(RecordBatch::try_new(Arc::clone(schema), columns)?)
}

fn decode_base64_column(
    name: &str,
    values: impl Iterator<Item = Option<String>>,
) -> ConnectorResult<BinaryArray> {
    let decoded = values
        .map(|v| {
            v.map(|text| base64_engine.decode(text.as_bytes()))
                .transpose()
                .map_err(|e| ConnectorError::Decode(format!("column '{}': {}", name, e)))
        })
        .collect::<ConnectorResult<Vec<Option<Vec<u8>>>>>()?;
    Ok(decoded.into_iter().collect())
}

// ---- Session ----

struct StatementSession {
    http: reqwest::Client,
    options: StatementApiOptions,
    base_url: String,
    warehouse_id: String,
    access_token: String,
    use_cloud_fetch: bool,
    finished: Option<StatementResponse>,
}

impl StatementSession {
    async fn read_json<T: DeserializeOwned>(
        resp: reqwest::Response,
        what: &str,
    ) -> ConnectorResult<T> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = resp.text().await.unwrap_or_default();
            return Err(ConnectorError::AuthFailed(format!("HTTP {}: {}", status, body)));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ConnectorError::QueryFailed(format!(
                "{}: HTTP {}: {}",
                what, status, body
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ConnectorError::Decode(format!("{}: {}", what, e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> ConnectorResult<T> {
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::read_json(resp, what).await
    }

    async fn submit(&self, sql: &str) -> ConnectorResult<StatementResponse> {
        let (disposition, format) = if self.use_cloud_fetch {
            ("EXTERNAL_LINKS", "ARROW_STREAM")
        } else {
            ("INLINE", "JSON_ARRAY")
        };
        let request = ExecuteStatementRequest {
            statement: sql,
            warehouse_id: &self.warehouse_id,
            wait_timeout: format!("{}s", self.options.wait_timeout_secs),
            on_wait_timeout: "CONTINUE",
            disposition,
            format,
        };

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, STATEMENTS_PATH))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;
        Self::read_json(resp, "submit statement").await
    }

    async fn download_arrow(&self, link: &ExternalLink) -> ConnectorResult<Vec<RecordBatch>> {
        debug!("Downloading result chunk {:?}", link.chunk_index);
        // Pre-signed links carry their own credentials.
        let resp = self.http.get(&link.external_link).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ConnectorError::QueryFailed(format!(
                "download chunk {:?}: HTTP {}: {}",
                link.chunk_index, status, body
            )));
        }
        let bytes = resp.bytes().await?;
        let reader = StreamReader::try_new(Cursor::new(bytes), None)?;
        Ok(reader.collect::<Result<Vec<_>, _>>()?)
    }

    async fn decode_chunk(
        &self,
        data: &ResultData,
        schema: &SchemaRef,
    ) -> ConnectorResult<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        for link in &data.external_links {
            batches.extend(self.download_arrow(link).await?);
        }
        if let Some(rows) = &data.data_array {
            if !rows.is_empty() {
                batches.push(json_rows_to_batch(rows, schema)?);
            }
        }
        debug!(
            "Decoded chunk {:?} into {} batch(es)",
            data.chunk_index,
            batches.len()
        );
        Ok(batches)
    }
}

#[async_trait]
impl WarehouseSession for StatementSession {
    async fn execute(&mut self, sql: &str) -> ConnectorResult<()> {
        let mut response = self.submit(sql).await?;

        while !response.status.state.is_terminal() {
            debug!(
                "Statement {} is {:?}, polling again in {:?}",
                response.statement_id, response.status.state, self.options.poll_interval
            );
            tokio::time::sleep(self.options.poll_interval).await;
            response = self
                .get_json(
                    &format!("{}{}", STATEMENTS_PATH, response.statement_id),
                    "poll statement",
                )
                .await?;
        }

        if response.status.state != StatementState::Succeeded {
            return Err(ConnectorError::QueryFailed(failure_message(&response.status)));
        }

        info!(
            "Statement {} succeeded: rows={:?}, chunks={:?}",
            response.statement_id,
            response.manifest.as_ref().and_then(|m| m.total_row_count),
            response.manifest.as_ref().and_then(|m| m.total_chunk_count)
        );
        self.finished = Some(response);
        Ok(())
    }

    async fn fetch_all_arrow(&mut self) -> ConnectorResult<ResultSet> {
        let response = self.finished.take().ok_or_else(|| {
            ConnectorError::QueryFailed("no executed statement to fetch from".to_string())
        })?;
        let schema = manifest_schema(response.manifest.as_ref());

        let mut current = match response.result {
            Some(data) => Some(data),
            None if response
                .manifest
                .as_ref()
                .and_then(|m| m.total_chunk_count)
                .unwrap_or(0)
                > 0 =>
            {
                let path = format!(
                    "{}{}/result/chunks/0",
                    STATEMENTS_PATH, response.statement_id
                );
                Some(self.get_json::<ResultData>(&path, "fetch chunk").await?)
            }
            None => None,
        };

        let mut batches = Vec::new();
        while let Some(data) = current {
            batches.extend(self.decode_chunk(&data, &schema).await?);
            current = match data.next_link() {
                Some(link) => Some(self.get_json(&link, "fetch chunk").await?),
                None => None,
            };
        }

        let schema = batches.first().map(|b| b.schema()).unwrap_or(schema);
        Ok(ResultSet { schema, batches })
    }
}
