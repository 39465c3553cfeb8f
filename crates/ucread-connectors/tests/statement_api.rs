//! Integration tests for the Statement Execution API client using wiremock to
//! mock the warehouse.

use std::sync::Arc;
use std::time::Duration;

use arrow::array::{Array, Date32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use serde_json::json;
use ucread_connectors::{
    ConnectOptions, ConnectorError, InputContext, StatementApiClient, StatementApiOptions,
    UnityCatalogInputManager, WarehouseClient, WarehouseSession,
};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATEMENTS: &str = "/api/2.0/sql/statements/";

fn client() -> StatementApiClient {
    StatementApiClient::new(StatementApiOptions {
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    })
    .unwrap()
}

fn options(server: &MockServer, use_cloud_fetch: bool) -> ConnectOptions {
    ConnectOptions {
        server_hostname: server.uri(),
        http_path: "/sql/1.0/warehouses/abc".to_string(),
        access_token: "tok".to_string(),
        use_cloud_fetch,
    }
}

fn manifest() -> serde_json::Value {
    json!({
        "format": "JSON_ARRAY",
        "schema": {
            "column_count": 3,
            "columns": [
                {"name": "id", "type_name": "LONG", "type_text": "BIGINT", "position": 0},
                {"name": "name", "type_name": "STRING", "type_text": "STRING", "position": 1},
                {"name": "day", "type_name": "DATE", "type_text": "DATE", "position": 2}
            ]
        },
        "total_chunk_count": 1,
        "total_row_count": 2
    })
}

fn ipc_bytes(batch: &RecordBatch) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut writer = StreamWriter::try_new(&mut buf, &batch.schema()).unwrap();
        writer.write(batch).unwrap();
        writer.finish().unwrap();
    }
    buf
}

fn arrow_batch(ids: Vec<i64>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
    RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(ids))]).unwrap()
}

// ---- inline results ----

#[tokio::test]
async fn test_inline_json_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .and(header("authorization", "Bearer tok"))
        .and(body_partial_json(json!({
            "statement": "SELECT * FROM `c`.`s`.`t`",
            "warehouse_id": "abc",
            "disposition": "INLINE",
            "format": "JSON_ARRAY"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s1",
            "status": {"state": "SUCCEEDED"},
            "manifest": manifest(),
            "result": {
                "chunk_index": 0,
                "row_count": 2,
                "data_array": [["1", "alice", "2024-01-01"], ["2", null, "2024-01-02"]]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, false)).await.unwrap();
    session.execute("SELECT * FROM `c`.`s`.`t`").await.unwrap();
    let result = session.fetch_all_arrow().await.unwrap();

    assert_eq!(result.num_rows(), 2);
    let batch = result.into_batch().unwrap();
    assert_eq!(batch.schema().field(0).data_type(), &DataType::Int64);
    assert_eq!(batch.schema().field(2).data_type(), &DataType::Date32);

    let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![1, 2]);
    let names = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(names.value(0), "alice");
    assert!(names.is_null(1));
    let days = batch.column(2).as_any().downcast_ref::<Date32Array>().unwrap();
    assert_eq!(days.len(), 2);
}

#[tokio::test]
async fn test_inline_chunks_are_followed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s1",
            "status": {"state": "SUCCEEDED"},
            "manifest": manifest(),
            "result": {
                "chunk_index": 0,
                "data_array": [["1", "a", "2024-01-01"]],
                "next_chunk_internal_link": "/api/2.0/sql/statements/s1/result/chunks/1"
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s1/result/chunks/1"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chunk_index": 1,
            "data_array": [["2", "b", "2024-01-02"], ["3", "c", "2024-01-03"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, false)).await.unwrap();
    session.execute("SELECT 1").await.unwrap();
    let result = session.fetch_all_arrow().await.unwrap();

    assert_eq!(result.batches.len(), 2);
    assert_eq!(result.num_rows(), 3);
}

#[tokio::test]
async fn test_empty_result_uses_manifest_schema() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s1",
            "status": {"state": "SUCCEEDED"},
            "manifest": {
                "schema": {"columns": [
                    {"name": "id", "type_name": "LONG", "position": 0},
                    {"name": "amount", "type_name": "DECIMAL", "type_text": "decimal(18,2)", "position": 1}
                ]},
                "total_chunk_count": 0,
                "total_row_count": 0
            }
        })))
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, true)).await.unwrap();
    session.execute("SELECT 1").await.unwrap();
    let batch = session.fetch_all_arrow().await.unwrap().into_batch().unwrap();

    assert_eq!(batch.num_rows(), 0);
    assert_eq!(batch.schema().fields().len(), 2);
    assert_eq!(
        batch.schema().field(1).data_type(),
        &DataType::Decimal128(18, 2)
    );
}

// ---- polling and failures ----

#[tokio::test]
async fn test_pending_statement_is_polled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s2",
            "status": {"state": "PENDING"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s2",
            "status": {"state": "SUCCEEDED"},
            "manifest": manifest(),
            "result": {"chunk_index": 0, "data_array": [["7", "x", "2024-01-01"]]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, false)).await.unwrap();
    session.execute("SELECT 1").await.unwrap();
    assert_eq!(session.fetch_all_arrow().await.unwrap().num_rows(), 1);
}

#[tokio::test]
async fn test_failed_statement_surfaces_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s3",
            "status": {
                "state": "FAILED",
                "error": {
                    "error_code": "BAD_REQUEST",
                    "message": "[TABLE_OR_VIEW_NOT_FOUND] The table `c`.`s`.`t` cannot be found."
                }
            }
        })))
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, true)).await.unwrap();
    let err = session.execute("SELECT * FROM `c`.`s`.`t`").await.unwrap_err();

    assert!(matches!(err, ConnectorError::QueryFailed(_)));
    assert!(err.to_string().contains("TABLE_OR_VIEW_NOT_FOUND"));
}

#[tokio::test]
async fn test_unauthorized_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid access token"))
        .mount(&server)
        .await;

    let mut session = client().connect(options(&server, true)).await.unwrap();
    let err = session.execute("SELECT 1").await.unwrap_err();

    assert!(matches!(err, ConnectorError::AuthFailed(_)));
    assert!(err.to_string().contains("Invalid access token"));
}

#[tokio::test]
async fn test_fetch_without_execute_fails() {
    let server = MockServer::start().await;
    let mut session = client().connect(options(&server, true)).await.unwrap();
    assert!(session.fetch_all_arrow().await.is_err());
}

// ---- cloud fetch through the input manager ----

#[tokio::test]
async fn test_input_manager_reads_arrow_external_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("POST"))
        .and(path(STATEMENTS))
        .and(header("authorization", "Bearer fresh-token"))
        .and(body_partial_json(json!({
            "statement": "SELECT `id` FROM `main`.`sales`.`orders` WHERE day == \"2024-01-01\"",
            "warehouse_id": "abc",
            "disposition": "EXTERNAL_LINKS",
            "format": "ARROW_STREAM"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statement_id": "s4",
            "status": {"state": "SUCCEEDED"},
            "manifest": {
                "format": "ARROW_STREAM",
                "schema": {"columns": [{"name": "id", "type_name": "LONG", "position": 0}]},
                "total_chunk_count": 2,
                "total_row_count": 3
            },
            "result": {
                "external_links": [{
                    "chunk_index": 0,
                    "external_link": format!("{}/storage/chunk0", base),
                    "next_chunk_index": 1,
                    "next_chunk_internal_link": "/api/2.0/sql/statements/s4/result/chunks/1"
                }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/2.0/sql/statements/s4/result/chunks/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "external_links": [{
                "chunk_index": 1,
                "external_link": format!("{}/storage/chunk1", base)
            }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/chunk0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ipc_bytes(&arrow_batch(vec![1, 2]))))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/storage/chunk1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(ipc_bytes(&arrow_batch(vec![3]))))
        .mount(&server)
        .await;

    let manager = UnityCatalogInputManager::new(
        Arc::new(|| Ok::<_, anyhow::Error>("fresh-token".to_string())),
        base.clone(),
        "/sql/1.0/warehouses/abc",
    )
    .unwrap();

    let upstream = json!({
        "catalog": "main",
        "schema": "sales",
        "table": "orders",
        "partition_expr": "day"
    });
    let ctx = InputContext::new(upstream.as_object().cloned().unwrap())
        .with_metadata(json!({"columns": ["id"]}).as_object().cloned().unwrap())
        .with_partitions(["2024-01-01"]);

    let batch = manager.load_input(&ctx).await.unwrap();
    assert_eq!(batch.num_rows(), 3);
    let ids = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    assert_eq!(ids.values().to_vec(), vec![1, 2, 3]);
}
