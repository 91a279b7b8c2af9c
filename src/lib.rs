//! uds-client - client for the unified data service.
//!
//! Submits SQL to the service and decodes the Arrow results, and wraps the
//! metric and table REST resources. The library is also used by the `uds`
//! binary and the integration tests.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod render;
pub mod resources;
pub mod routes;
pub mod transport;
