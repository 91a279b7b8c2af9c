//! Logical table definitions: a directory of metrics keyed by field name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{null_as_default, FieldType, Resource, ResourceId};

/// Granularity of a table's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeGranularity {
    Minute,
    Daily,
    Weekly,
    Monthly,
}

impl fmt::Display for TimeGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Minute => "MINUTE",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    /// Unique name, also used by `byName` lookups and in SQL.
    pub table_name: String,

    /// e.g. `["stock_code", "trade_time"]`
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_keys: Vec<String>,

    /// Field name to metric name. Metric names may carry parameters,
    /// e.g. `close_price(adjust=post)`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub metric_fields: BTreeMap<String, String>,

    /// Logical field name to physical field name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_mapping: BTreeMap<String, String>,

    /// Logical field name to declared type.
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_types: BTreeMap<String, FieldType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_granularity: Option<TimeGranularity>,
}

impl Resource for TableDefinition {
    const PATH: &'static [&'static str] = &["api", "tables"];
    const NAME: &'static str = "table";
}
