//! HTTP transport layer.
//!
//! Provides a trait-based interface for issuing a single HTTP round trip,
//! so the query executor and resource clients can run against the real
//! reqwest client or an in-memory mock interchangeably.

mod http;
mod mock;

pub use http::ReqwestTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use bytes::Bytes;
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::error::TransportError;

/// HTTP verbs used by the service API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Returns the verb as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the transport must hand back the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseMode {
    /// Body is decoded as text (JSON endpoints).
    #[default]
    Text,
    /// Body is delivered as the untouched byte buffer.
    Binary,
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Sent verbatim as `text/plain`.
    Text(String),
    /// Serialized as `application/json`.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Content type header implied by the body, if any.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Text(_) => Some("text/plain"),
            Self::Json(_) => Some("application/json"),
        }
    }
}

/// A single outbound request, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Unencoded path segments; the transport percent-encodes them.
    pub segments: Vec<String>,
    /// Unencoded query parameters, in order.
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Value for the `Accept` header.
    pub accept: Option<&'static str>,
    pub response_mode: ResponseMode,
    /// Per-request deadline, overriding the client default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// Creates a bodiless request expecting a text response.
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: RequestBody::Empty,
            accept: None,
            response_mode: ResponseMode::Text,
            timeout: None,
        }
    }

    /// Appends a query parameter.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Sets the `Accept` header.
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    /// Requires the body to come back as raw bytes.
    pub fn expect_binary(mut self) -> Self {
        self.response_mode = ResponseMode::Binary;
        self
    }

    /// Sets a per-request deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the path as `/seg/seg`, without percent-encoding or query.
    pub fn path(&self) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }
}

/// Response body in the mode the request asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Text(String),
    Binary(Bytes),
}

/// Status, declared content type and body of a completed round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ResponseBody,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body bytes regardless of mode.
    pub fn bytes(&self) -> &[u8] {
        match &self.body {
            ResponseBody::Text(text) => text.as_bytes(),
            ResponseBody::Binary(bytes) => bytes,
        }
    }

    /// Returns the body as text, lossily for binary bodies.
    pub fn text(&self) -> Cow<'_, str> {
        match &self.body {
            ResponseBody::Text(text) => Cow::Borrowed(text),
            ResponseBody::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }
}

/// Trait for anything that can perform one HTTP round trip.
///
/// Implementations must be thread-safe so independent calls can share one transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the request and returns the response, whatever its status.
    ///
    /// Only failures that leave no HTTP status behind are errors.
    async fn send(&self, request: HttpRequest) -> Result<RawResponse, TransportError>;
}
