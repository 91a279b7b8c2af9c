//! SQL query execution and result decoding.
//!
//! The executor performs the HTTP round trip; the decoders turn the Arrow or
//! JSON payload into a [`DecodedTable`].

pub mod decode;
pub mod executor;
mod frames;
pub mod json;
mod types;

pub use decode::decode;
pub use executor::{
    ExecuteOptions, QueryExecutor, QueryRequest, ResultFormat, Submission, QUERY_PATH,
};
pub use json::decode_json;
pub use types::{ColumnInfo, DecodedTable, Row, Value};
