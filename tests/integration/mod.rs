//! End-to-end tests against a local stand-in for the service.

pub mod fixtures;
pub mod query_test;
pub mod resources_test;
pub mod server;
