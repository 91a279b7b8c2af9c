//! Error types for the unified data service client.
//!
//! `UdsError` is the application-level error. The query path has its own
//! tagged `QueryError`, which every caller of the executor receives as a value
//! instead of a propagated fault.

use thiserror::Error;

/// Main error type for client operations.
#[derive(Error, Debug)]
pub enum UdsError {
    /// Configuration errors (invalid config file, bad base URL, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line input (bad JSON payload, unknown route, etc.)
    #[error("Invalid input: {0}")]
    Input(String),

    /// The request never produced an HTTP response.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A response body could not be interpreted.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A SQL query failed.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UdsError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a server error for the given status and body.
    pub fn server(status: u16, msg: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: msg.into(),
        }
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Input(_) => "Input Error",
            Self::Transport(_) => "Transport Error",
            Self::Server { .. } => "Server Error",
            Self::Decode(_) => "Decode Error",
            Self::Query(_) => "Query Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Failures that happen before an HTTP status is available.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("request was cancelled")]
    Cancelled,

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Reasons a payload is not a well-formed columnar record batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("invalid Arrow IPC payload: {0}")]
    Arrow(String),

    #[error("invalid JSON result: {0}")]
    Json(String),

    #[error("schema declares {declared} columns but the batch carries {actual}")]
    ColumnCount { declared: usize, actual: usize },

    #[error("column '{column}' has {actual} values but the batch declares {declared} rows")]
    RowCount {
        column: String,
        declared: usize,
        actual: usize,
    },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("column '{column}': {message}")]
    Value { column: String, message: String },

    #[error("batch declares {rows} rows, more than can be held in memory")]
    TooLarge { rows: usize },
}

impl From<arrow::error::ArrowError> for DecodeError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Arrow(err.to_string())
    }
}

/// Outcome of a failed SQL query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Connection failure, timeout or cancellation.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The server returned a non-2xx status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The response bytes did not decode into a table.
    #[error("malformed payload: {0}")]
    Decode(#[from] DecodeError),
}

impl QueryError {
    /// Short tag for the rendering layer.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Server { .. } => "server",
            Self::Decode(_) => "decode",
        }
    }

    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using UdsError.
pub type Result<T> = std::result::Result<T, UdsError>;
