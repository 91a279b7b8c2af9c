//! Query execution over HTTP.
//!
//! The server picks its reply from the SQL text it receives.

use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uds_client::error::{DecodeError, QueryError, TransportError};
use uds_client::query::{ExecuteOptions, QueryExecutor, ResultFormat, Submission, Value};

use super::fixtures;
use super::server::transport_for;

fn arrow(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        body,
    )
        .into_response()
}

async fn query(headers: HeaderMap, sql: String) -> Response {
    let is_text = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/plain"));
    if !is_text {
        return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response();
    }

    match sql.as_str() {
        "SELECT 1 AS x" => arrow(fixtures::select_one()),
        "SELECT a, b FROM empty" => arrow(fixtures::empty_ab()),
        "SELECT * FROM daily_bar" => arrow(fixtures::daily_bar()),
        "SELECT * FROM daily_bar_file" => arrow(fixtures::daily_bar_file()),
        "SELECT broken" => arrow(b"definitely not arrow".to_vec()),
        "SELECT nothing" => arrow(Vec::new()),
        "SELECT crash" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "SELECT slow" => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            arrow(fixtures::select_one())
        }
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query failed: unknown statement '{other}'"),
        )
            .into_response(),
    }
}

/// `GET /api/query?sql=..&format=json|arrow`, arrow when `format` is absent.
async fn query_get(Query(params): Query<HashMap<String, String>>) -> Response {
    let Some(sql) = params.get("sql") else {
        return (StatusCode::BAD_REQUEST, "missing sql").into_response();
    };
    let as_json = params.get("format").is_some_and(|f| f == "json");

    match (sql.as_str(), as_json) {
        ("SELECT 1 AS x", false) => arrow(fixtures::select_one()),
        ("SELECT 1 AS x", true) => {
            Json(json!({"data": [{"x": 1}], "rowCount": 1})).into_response()
        }
        ("SELECT * FROM daily_bar", true) => Json(json!({
            "data": [
                {"stock_code": "600000", "close": 10.5, "volume": 1200, "halted": false},
                {"stock_code": "600519", "close": null, "volume": 0, "halted": true}
            ],
            "rowCount": 2
        }))
        .into_response(),
        (other, _) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Query failed: unknown statement '{other}'"),
        )
            .into_response(),
    }
}

fn app() -> Router {
    Router::new().route("/api/query", get(query_get).post(query))
}

#[tokio::test]
async fn test_select_one_end_to_end() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let table = executor.execute("SELECT 1 AS x").await.unwrap();

    assert_eq!(table.column_names(), vec!["x"]);
    assert_eq!(table.rows(), &[vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_zero_row_result_is_not_an_error() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let table = executor.execute("SELECT a, b FROM empty").await.unwrap();

    assert_eq!(table.column_names(), vec!["a", "b"]);
    assert!(table.rows().is_empty());
}

#[tokio::test]
async fn test_mixed_types_and_nulls() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    for sql in ["SELECT * FROM daily_bar", "SELECT * FROM daily_bar_file"] {
        let table = executor.execute(sql).await.unwrap();

        assert_eq!(
            table.column_names(),
            vec!["stock_code", "close", "volume", "halted"]
        );
        assert_eq!(
            table.rows()[1],
            vec![
                Value::from("600519"),
                Value::Null,
                Value::Int(0),
                Value::Bool(true)
            ]
        );
        assert_eq!(table.get(2, 2), Some(&Value::Null));
        assert!(table.rows().iter().all(|row| row.len() == 4));
    }
}

#[tokio::test]
async fn test_server_error_without_body() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let err = executor.execute("SELECT crash").await.unwrap_err();

    assert_eq!(
        err,
        QueryError::Server {
            status: 500,
            message: String::new()
        }
    );
}

#[tokio::test]
async fn test_server_error_message_is_kept() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let err = executor.execute("DROP TABLE daily_bar").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(
        err,
        QueryError::Server {
            status: 500,
            message: "Query failed: unknown statement 'DROP TABLE daily_bar'".to_string()
        }
    );
}

#[tokio::test]
async fn test_malformed_and_empty_payloads() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let err = executor.execute("SELECT broken").await.unwrap_err();
    assert_eq!(err.tag(), "decode");

    let err = executor.execute("SELECT nothing").await.unwrap_err();
    assert_eq!(err, QueryError::Decode(DecodeError::Empty));
}

#[tokio::test]
async fn test_timeout_is_transport_failure() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let err = executor
        .execute_with(
            "SELECT slow",
            ExecuteOptions::default().with_timeout(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert_eq!(err, QueryError::Transport(TransportError::Timeout));
}

#[tokio::test]
async fn test_cancellation_is_transport_failure() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = executor
        .execute_with("SELECT slow", ExecuteOptions::default().with_cancel(token))
        .await
        .unwrap_err();

    assert_eq!(err, QueryError::Transport(TransportError::Cancelled));
}

#[tokio::test]
async fn test_concurrent_queries() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let (one, empty, bars) = tokio::join!(
        executor.execute("SELECT 1 AS x"),
        executor.execute("SELECT a, b FROM empty"),
        executor.execute("SELECT * FROM daily_bar"),
    );

    assert_eq!(one.unwrap().row_count(), 1);
    assert_eq!(empty.unwrap().row_count(), 0);
    assert_eq!(bars.unwrap().row_count(), 3);
}

#[tokio::test]
async fn test_get_json_end_to_end() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let table = executor.execute_json("SELECT * FROM daily_bar").await.unwrap();

    assert_eq!(
        table.column_names(),
        vec!["close", "halted", "stock_code", "volume"]
    );
    assert_eq!(
        table.rows()[0],
        vec![
            Value::Float(10.5),
            Value::Bool(false),
            Value::from("600000"),
            Value::Int(1200)
        ]
    );
    assert_eq!(table.get(1, 0), Some(&Value::Null));
}

#[tokio::test]
async fn test_get_arrow_end_to_end() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);
    let options = ExecuteOptions::default().via(Submission::Get(ResultFormat::Arrow));

    let table = executor.execute_with("SELECT 1 AS x", options).await.unwrap();

    assert_eq!(table.rows(), &[vec![Value::Int(1)]]);
}

#[tokio::test]
async fn test_get_json_server_error() {
    let transport = transport_for(app()).await;
    let executor = QueryExecutor::new(&transport);

    let err = executor
        .execute_json("SELECT * FROM t WHERE code = '60 0&0'")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        QueryError::Server {
            status: 500,
            message: "Query failed: unknown statement 'SELECT * FROM t WHERE code = '60 0&0''"
                .to_string()
        }
    );
}
