use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grants a platform-wide role to an account
/// (`globalrolebindings.management.cattle.io`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRoleBinding {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub global_role_name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
