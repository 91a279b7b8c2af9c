//! Metric definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{null_as_default, Resource, ResourceId};

/// Where a metric's raw data is pulled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceType {
    HttpJson,
    FileCsv,
}

impl fmt::Display for DataSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HttpJson => "HTTP_JSON",
            Self::FileCsv => "FILE_CSV",
        })
    }
}

/// Declared type of a source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String,
    Long,
    Double,
    Boolean,
    Timestamp,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "STRING",
            Self::Long => "LONG",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        };
        f.write_str(name)
    }
}

/// A named metric and the source it is loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricInfo {
    /// Assigned by the server on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    pub name: String,

    pub data_source_type: DataSourceType,

    pub source_url: String,

    /// Dotted path to the data array inside a JSON document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,

    /// Source field name to declared type.
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_mappings: BTreeMap<String, FieldType>,
}

impl Resource for MetricInfo {
    const PATH: &'static [&'static str] = &["api", "metrics"];
    const NAME: &'static str = "metric";
}
