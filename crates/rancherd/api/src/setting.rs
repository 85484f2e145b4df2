use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub default: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Setting {
    /// The explicit value if set, else the default if set.
    pub fn effective_value(&self) -> Option<&str> {
        [&self.value, &self.default]
            .into_iter()
            .find(|value| !value.is_empty())
            .map(String::as_str)
    }
}
