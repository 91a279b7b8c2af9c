//! SQL query execution over HTTP.
//!
//! Submits SQL text to `POST /api/query`, asks for a binary Arrow body, and
//! decodes it. The same endpoint also answers `GET` with the SQL as a query
//! parameter, in Arrow or JSON. Every failure is returned as a
//! [`QueryError`] value.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::decode::decode;
use super::json::decode_json;
use super::types::DecodedTable;
use crate::error::{QueryError, TransportError};
use crate::transport::{HttpRequest, Method, RawResponse, RequestBody, Transport};

/// Path segments of the query endpoint.
pub const QUERY_PATH: [&str; 2] = ["api", "query"];

/// Accept header for Arrow replies.
const ARROW_ACCEPT: &str = "application/vnd.apache.arrow.stream, application/octet-stream";

/// Accept header for JSON replies.
const JSON_ACCEPT: &str = "application/json";

/// Result encoding requested from `GET /api/query`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Arrow,
    Json,
}

impl ResultFormat {
    /// Value of the `format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arrow => "arrow",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ResultFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arrow" => Ok(Self::Arrow),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid result format: {s}. Expected: arrow or json")),
        }
    }
}

/// How the SQL reaches the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Submission {
    /// Raw SQL body on `POST /api/query`; Arrow reply.
    #[default]
    Post,
    /// `GET /api/query?sql=..&format=..`.
    Get(ResultFormat),
}

impl Submission {
    /// Encoding the server answers with.
    pub fn result_format(&self) -> ResultFormat {
        match self {
            Self::Post => ResultFormat::Arrow,
            Self::Get(format) => *format,
        }
    }
}

/// A single SQL submission. The text is sent exactly as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    sql: String,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self { sql: sql.into() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Builds the HTTP request. Arrow replies use binary response mode.
    pub fn into_http(self, submission: Submission, timeout: Option<Duration>) -> HttpRequest {
        let request = match submission {
            Submission::Post => {
                HttpRequest::new(Method::Post, QUERY_PATH).with_body(RequestBody::Text(self.sql))
            }
            Submission::Get(format) => HttpRequest::new(Method::Get, QUERY_PATH)
                .with_query_param("sql", self.sql)
                .with_query_param("format", format.as_str()),
        };

        match submission.result_format() {
            ResultFormat::Arrow => request.with_accept(ARROW_ACCEPT).expect_binary(),
            ResultFormat::Json => request.with_accept(JSON_ACCEPT),
        }
        .with_timeout(timeout)
    }
}

/// Optional limits for a single execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Deadline for the whole round trip, also forwarded to the transport.
    pub timeout: Option<Duration>,
    /// Cancels the in-flight request when triggered.
    pub cancel: Option<CancellationToken>,
    /// POST with a text body (the default) or GET with query parameters.
    pub submission: Submission,
}

impl ExecuteOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn via(mut self, submission: Submission) -> Self {
        self.submission = submission;
        self
    }
}

/// Query executor bound to a transport.
///
/// Holds no state between calls; concurrent `execute` calls are independent.
#[derive(Clone, Copy)]
pub struct QueryExecutor<'a> {
    transport: &'a dyn Transport,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Executes `sql` and decodes the result.
    pub async fn execute(&self, sql: &str) -> Result<DecodedTable, QueryError> {
        self.execute_with(sql, ExecuteOptions::default()).await
    }

    /// Executes `sql` through `GET /api/query` with a JSON reply.
    pub async fn execute_json(&self, sql: &str) -> Result<DecodedTable, QueryError> {
        let options = ExecuteOptions::default().via(Submission::Get(ResultFormat::Json));
        self.execute_with(sql, options).await
    }

    /// Executes `sql` with an optional timeout and cancellation token.
    pub async fn execute_with(
        &self,
        sql: &str,
        options: ExecuteOptions,
    ) -> Result<DecodedTable, QueryError> {
        let request = QueryRequest::new(sql);
        debug!("Submitting query ({:?}): {}", options.submission, request.sql());

        let start = Instant::now();
        let format = options.submission.result_format();
        let result = match self.round_trip(request, &options).await {
            Ok(response) => interpret(response, format),
            Err(e) => Err(e.into()),
        };
        let elapsed = start.elapsed();

        match &result {
            Ok(table) => info!(
                "Query returned {} rows x {} columns in {:?}",
                table.row_count(),
                table.column_count(),
                elapsed
            ),
            Err(e) => warn!("Query failed after {:?} ({}): {}", elapsed, e.tag(), e),
        }

        result
    }

    /// Performs the single HTTP round trip, bounded by the options.
    async fn round_trip(
        &self,
        request: QueryRequest,
        options: &ExecuteOptions,
    ) -> Result<RawResponse, TransportError> {
        let send = self
            .transport
            .send(request.into_http(options.submission, options.timeout));

        let bounded = async {
            match options.timeout {
                Some(timeout) => match tokio::time::timeout(timeout, send).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                },
                None => send.await,
            }
        };

        match &options.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(TransportError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

/// Classifies a completed response and decodes success bodies.
fn interpret(response: RawResponse, format: ResultFormat) -> Result<DecodedTable, QueryError> {
    if !response.is_success() {
        return Err(QueryError::Server {
            status: response.status,
            message: response.text().trim().to_string(),
        });
    }

    debug!(
        "Decoding {} byte payload (declared content type: {})",
        response.bytes().len(),
        response.content_type.as_deref().unwrap_or("none")
    );

    let table = match format {
        ResultFormat::Arrow => decode(response.bytes())?,
        ResultFormat::Json => decode_json(&response.text())?,
    };
    Ok(table)
}
