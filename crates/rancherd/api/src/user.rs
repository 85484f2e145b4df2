use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A platform account (`users.management.cattle.io`).
///
/// The platform keeps the account fields at the top level of the object,
/// not under `spec`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default)]
    pub username: String,
    /// Hash of the login credential.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub must_change_password: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
