//! Mock transport for testing.
//!
//! Serves canned responses keyed by method and path, and records every
//! request it receives so tests can assert on what went over the wire.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::{HttpRequest, Method, RawResponse, ResponseBody, ResponseMode, Transport};
use crate::error::TransportError;

/// Content type the service uses for Arrow payloads.
const ARROW_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
enum MockReply {
    Response {
        status: u16,
        content_type: Option<String>,
        body: Bytes,
    },
    Failure(TransportError),
}

/// A transport that returns predefined results.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: HashMap<(Method, String), MockReply>,
    delay: Option<Duration>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    /// Creates a mock that answers 404 to everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a response for `method path`.
    pub fn with_response(
        mut self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        content_type: Option<&str>,
        body: impl Into<Bytes>,
    ) -> Self {
        self.replies.insert(
            (method, path.into()),
            MockReply::Response {
                status,
                content_type: content_type.map(String::from),
                body: body.into(),
            },
        );
        self
    }

    /// Registers a 200 Arrow response for `POST path`.
    pub fn with_arrow(self, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.with_response(Method::Post, path, 200, Some(ARROW_CONTENT_TYPE), body)
    }

    /// Registers a JSON response for `method path`.
    pub fn with_json(
        self,
        method: Method,
        path: impl Into<String>,
        status: u16,
        body: &serde_json::Value,
    ) -> Self {
        self.with_response(
            method,
            path,
            status,
            Some("application/json"),
            body.to_string(),
        )
    }

    /// Makes `method path` fail without producing a response.
    pub fn with_failure(
        mut self,
        method: Method,
        path: impl Into<String>,
        error: TransportError,
    ) -> Self {
        self.replies
            .insert((method, path.into()), MockReply::Failure(error));
        self
    }

    /// Delays every reply, honouring per-request timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn record(&self, request: &HttpRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError> {
        self.record(&request);

        if let Some(delay) = self.delay {
            match request.timeout {
                Some(timeout) if timeout < delay => {
                    tokio::time::sleep(timeout).await;
                    return Err(TransportError::Timeout);
                }
                _ => tokio::time::sleep(delay).await,
            }
        }

        let reply = self
            .replies
            .get(&(request.method, request.path()))
            .cloned()
            .unwrap_or(MockReply::Response {
                status: 404,
                content_type: None,
                body: Bytes::new(),
            });

        match reply {
            MockReply::Failure(error) => Err(error),
            MockReply::Response {
                status,
                content_type,
                body,
            } => {
                let body = match request.response_mode {
                    ResponseMode::Binary => ResponseBody::Binary(body),
                    ResponseMode::Text => {
                        ResponseBody::Text(String::from_utf8_lossy(&body).into_owned())
                    }
                };
                Ok(RawResponse {
                    status,
                    content_type,
                    body,
                })
            }
        }
    }
}
