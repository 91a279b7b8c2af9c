//! reqwest-backed transport.
//!
//! Joins request segments onto the configured base URL and performs the
//! round trip. In binary mode the body is read with `Response::bytes`, so the
//! buffer reaches the caller without any text re-encoding.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{HttpRequest, Method, RawResponse, RequestBody, ResponseBody, ResponseMode, Transport};
use crate::config::ServerConfig;
use crate::error::{Result, TransportError, UdsError};

/// HTTP transport over a pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport for the given server configuration.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let base_url = config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| UdsError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the absolute URL for a request, percent-encoding each segment
    /// and query parameter.
    fn url_for(&self, request: &HttpRequest) -> std::result::Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TransportError::Request(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(&request.segments);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }
}

/// Maps a reqwest failure onto the transport taxonomy.
fn map_reqwest_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> std::result::Result<RawResponse, TransportError> {
        let url = self.url_for(&request)?;
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(to_reqwest_method(request.method), url);

        if let Some(content_type) = request.body.content_type() {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(accept) = request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Text(text) => builder.body(text),
            RequestBody::Json(value) => builder.body(value.to_string()),
        };

        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = match request.response_mode {
            ResponseMode::Binary => {
                ResponseBody::Binary(response.bytes().await.map_err(map_reqwest_error)?)
            }
            ResponseMode::Text => {
                ResponseBody::Text(response.text().await.map_err(map_reqwest_error)?)
            }
        };

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}
