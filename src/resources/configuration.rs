//! Named configuration entries.

use serde::{Deserialize, Serialize};

use super::{Resource, ResourceId};

/// A stored configuration value. Names are unique on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Assigned by the server on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_value: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource for Configuration {
    const PATH: &'static [&'static str] = &["api", "configurations"];
    const NAME: &'static str = "configuration";
}
