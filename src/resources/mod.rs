//! REST clients for the metric, table and configuration resources.
//!
//! All resources expose the same verb set against a fixed base path, so a
//! single [`ResourceClient`] handles them, parameterized by the payload type.

mod configuration;
mod metric;
mod table;

pub use configuration::Configuration;
pub use metric::{DataSourceType, FieldType, MetricInfo};
pub use table::{TableDefinition, TimeGranularity};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::marker::PhantomData;
use tracing::debug;

use crate::error::{Result, UdsError};
use crate::transport::{HttpRequest, Method, RawResponse, RequestBody, Transport};

/// Server-assigned identifier.
pub type ResourceId = i64;

/// A JSON resource served under a fixed collection path.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    /// Collection path segments, e.g. `["api", "metrics"]`.
    const PATH: &'static [&'static str];

    /// Singular name used in log lines.
    const NAME: &'static str;
}

/// Stateless CRUD client for one resource type.
pub struct ResourceClient<'a, T> {
    transport: &'a dyn Transport,
    _resource: PhantomData<fn() -> T>,
}

/// Client for `/api/metrics`.
pub type MetricClient<'a> = ResourceClient<'a, MetricInfo>;

/// Client for `/api/tables`.
pub type TableClient<'a> = ResourceClient<'a, TableDefinition>;

/// Client for `/api/configurations`.
pub type ConfigurationClient<'a> = ResourceClient<'a, Configuration>;

impl<'a, T: Resource> ResourceClient<'a, T> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            _resource: PhantomData,
        }
    }

    /// `GET {path}`
    pub async fn list(&self) -> Result<Vec<T>> {
        let response = self.send(self.collection(Method::Get)).await?;
        parse_json(&response)
    }

    /// `GET {path}/{id}`
    pub async fn get(&self, id: ResourceId) -> Result<T> {
        let id = id.to_string();
        let response = self.send(self.member(Method::Get, &[id.as_str()])).await?;
        parse_json(&response)
    }

    /// `POST {path}`; returns the stored item with its assigned id.
    pub async fn create(&self, item: &T) -> Result<T> {
        let request = self
            .collection(Method::Post)
            .with_body(RequestBody::Json(to_json(item)?));
        let response = self.send(request).await?;
        parse_json(&response)
    }

    /// `PUT {path}/{id}`
    pub async fn update(&self, id: ResourceId, item: &T) -> Result<T> {
        let id = id.to_string();
        let request = self
            .member(Method::Put, &[id.as_str()])
            .with_body(RequestBody::Json(to_json(item)?));
        let response = self.send(request).await?;
        parse_json(&response)
    }

    /// `DELETE {path}/{id}`
    pub async fn delete(&self, id: ResourceId) -> Result<()> {
        let id = id.to_string();
        self.send(self.member(Method::Delete, &[id.as_str()])).await?;
        Ok(())
    }

    fn collection(&self, method: Method) -> HttpRequest {
        HttpRequest::new(method, T::PATH.iter().copied())
    }

    /// Builds a request below the collection path.
    fn member(&self, method: Method, tail: &[&str]) -> HttpRequest {
        HttpRequest::new(method, T::PATH.iter().chain(tail.iter()).copied())
    }

    /// Sends a request and turns non-2xx statuses into errors.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse> {
        debug!("{} {} ({})", request.method, request.path(), T::NAME);

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(UdsError::server(
                response.status,
                response.text().trim().to_string(),
            ));
        }
        Ok(response)
    }
}

impl ResourceClient<'_, TableDefinition> {
    /// `GET /api/tables/byName/{name}`
    pub async fn get_by_name(&self, name: &str) -> Result<TableDefinition> {
        let response = self
            .send(self.member(Method::Get, &["byName", name]))
            .await?;
        parse_json(&response)
    }
}

impl ResourceClient<'_, Configuration> {
    /// `GET /api/configurations/preview/{id}`; returns the plain-text preview.
    pub async fn preview(&self, id: ResourceId) -> Result<String> {
        let id = id.to_string();
        let response = self
            .send(self.member(Method::Get, &["preview", id.as_str()]))
            .await?;
        Ok(response.text().into_owned())
    }
}

fn to_json<T: Serialize>(item: &T) -> Result<serde_json::Value> {
    serde_json::to_value(item)
        .map_err(|e| UdsError::internal(format!("Failed to serialize request: {e}")))
}

fn parse_json<T: DeserializeOwned>(response: &RawResponse) -> Result<T> {
    serde_json::from_str(&response.text())
        .map_err(|e| UdsError::decode(format!("Failed to parse response: {e}")))
}

/// Treats an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
