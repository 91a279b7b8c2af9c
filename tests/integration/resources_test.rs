//! Metric, table and configuration CRUD over HTTP against an in-memory store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use uds_client::config::ServerConfig;
use uds_client::error::UdsError;
use uds_client::resources::{
    Configuration, ConfigurationClient, DataSourceType, FieldType, MetricClient, MetricInfo,
    TableClient, TableDefinition, TimeGranularity,
};
use uds_client::transport::ReqwestTransport;

use super::server::transport_for;

#[derive(Default)]
struct Items {
    next_id: i64,
    items: BTreeMap<i64, Value>,
}

#[derive(Clone, Default)]
struct Store(Arc<Mutex<Items>>);

async fn list(State(store): State<Store>) -> Json<Vec<Value>> {
    let items = store.0.lock().unwrap();
    Json(items.items.values().cloned().collect())
}

async fn create(State(store): State<Store>, Json(mut item): Json<Value>) -> Json<Value> {
    let mut items = store.0.lock().unwrap();
    items.next_id += 1;
    let id = items.next_id;
    item["id"] = json!(id);
    items.items.insert(id, item.clone());
    Json(item)
}

async fn get_one(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, StatusCode> {
    let items = store.0.lock().unwrap();
    items
        .items
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update(
    State(store): State<Store>,
    Path(id): Path<i64>,
    Json(mut item): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut items = store.0.lock().unwrap();
    if !items.items.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    item["id"] = json!(id);
    items.items.insert(id, item.clone());
    Ok(Json(item))
}

async fn delete_one(State(store): State<Store>, Path(id): Path<i64>) -> StatusCode {
    let mut items = store.0.lock().unwrap();
    match items.items.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

async fn by_name(
    State(store): State<Store>,
    Path(name): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let items = store.0.lock().unwrap();
    items
        .items
        .values()
        .find(|item| item["tableName"] == name.as_str())
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("Table not found: {name}")))
}

async fn preview(
    State(store): State<Store>,
    Path(id): Path<i64>,
) -> Result<String, StatusCode> {
    let items = store.0.lock().unwrap();
    let item = items.items.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(format!(
        "Previewing data for: {}",
        item["name"].as_str().unwrap_or_default()
    ))
}

fn crud(prefix: &str) -> Router<Store> {
    Router::new()
        .route(prefix, get(list).post(create))
        .route(
            &format!("{prefix}/:id"),
            get(get_one).put(update).delete(delete_one),
        )
}

fn app() -> Router {
    let metrics = crud("/api/metrics").with_state(Store::default());
    let tables = crud("/api/tables")
        .route("/api/tables/byName/:name", get(by_name))
        .with_state(Store::default());
    let configurations = crud("/api/configurations")
        .route("/api/configurations/preview/:id", get(preview))
        .with_state(Store::default());
    Router::new()
        .merge(metrics)
        .merge(tables)
        .merge(configurations)
}

fn close_price() -> MetricInfo {
    MetricInfo {
        id: None,
        name: "close_price".to_string(),
        data_source_type: DataSourceType::HttpJson,
        source_url: "http://feeds.example.com/close".to_string(),
        data_path: Some("data.items".to_string()),
        field_mappings: BTreeMap::from([
            ("close".to_string(), FieldType::Double),
            ("stock_code".to_string(), FieldType::String),
            ("trade_date".to_string(), FieldType::Timestamp),
        ]),
    }
}

fn daily_bar(name: &str) -> TableDefinition {
    TableDefinition {
        table_name: name.to_string(),
        primary_keys: vec!["stock_code".to_string(), "trade_date".to_string()],
        metric_fields: BTreeMap::from([("close".to_string(), "close_price".to_string())]),
        field_types: BTreeMap::from([("close".to_string(), FieldType::Double)]),
        time_granularity: Some(TimeGranularity::Daily),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_metric_lifecycle() {
    let transport = transport_for(app()).await;
    let client = MetricClient::new(&transport);

    assert!(client.list().await.unwrap().is_empty());

    let created = client.create(&close_price()).await.unwrap();
    let id = created.id.unwrap();
    assert_eq!(
        MetricInfo {
            id: None,
            ..created.clone()
        },
        close_price()
    );

    let mut changed = created.clone();
    changed.data_source_type = DataSourceType::FileCsv;
    changed.data_path = None;
    let updated = client.update(id, &changed).await.unwrap();
    assert_eq!(updated.data_source_type, DataSourceType::FileCsv);

    assert_eq!(client.get(id).await.unwrap(), updated);
    assert_eq!(client.list().await.unwrap(), vec![updated]);

    client.delete(id).await.unwrap();
    let err = client.get(id).await.unwrap_err();
    assert!(matches!(err, UdsError::Server { status: 404, .. }));
}

#[tokio::test]
async fn test_table_lookup_by_name() {
    let transport = transport_for(app()).await;
    let client = TableClient::new(&transport);

    client.create(&daily_bar("minute_bar")).await.unwrap();
    let created = client.create(&daily_bar("daily bar/v2")).await.unwrap();

    let found = client.get_by_name("daily bar/v2").await.unwrap();
    assert_eq!(found, created);

    let err = client.get_by_name("weekly_bar").await.unwrap_err();
    match err {
        UdsError::Server { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Table not found: weekly_bar");
        }
        other => panic!("Expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_configuration_lifecycle_and_preview() {
    let transport = transport_for(app()).await;
    let client = ConfigurationClient::new(&transport);

    let created = client
        .create(&Configuration {
            name: "retention_days".to_string(),
            config_type: Some("STORAGE".to_string()),
            config_value: Some("30".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let id = created.id.unwrap();

    assert_eq!(
        client.preview(id).await.unwrap(),
        "Previewing data for: retention_days"
    );

    let mut changed = created.clone();
    changed.config_value = Some("90".to_string());
    changed.description = Some("Keep a quarter".to_string());
    let updated = client.update(id, &changed).await.unwrap();
    assert_eq!(updated, changed);
    assert_eq!(client.list().await.unwrap(), vec![updated]);

    client.delete(id).await.unwrap();
    let err = client.preview(id).await.unwrap_err();
    assert!(matches!(err, UdsError::Server { status: 404, .. }));
}

#[tokio::test]
async fn test_resources_are_separate() {
    let transport = transport_for(app()).await;
    let metrics = MetricClient::new(&transport);
    let tables = TableClient::new(&transport);

    metrics.create(&close_price()).await.unwrap();

    assert_eq!(metrics.list().await.unwrap().len(), 1);
    assert!(tables.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_missing_is_server_error() {
    let transport = transport_for(app()).await;
    let client = TableClient::new(&transport);

    let err = client.update(41, &daily_bar("t")).await.unwrap_err();
    assert_eq!(err.category(), "Server Error");

    let err = client.delete(41).await.unwrap_err();
    assert!(matches!(err, UdsError::Server { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ServerConfig::new(format!("http://{addr}"));
    let transport = ReqwestTransport::new(&config).unwrap();
    let err = MetricClient::new(&transport).list().await.unwrap_err();

    assert_eq!(err.category(), "Transport Error");
}
