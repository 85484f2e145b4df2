use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A managed cluster record (`clusters.management.cattle.io`).
///
/// Only the metadata and the status conditions are interpreted; the rest of
/// the object is carried in `extra` so that an update writes it back as is.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClusterStatus>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Cluster {
    /// Returns `true` if the record exposes a conditions collection.
    ///
    /// The platform controller fills it in lazily, so a young record may
    /// have neither a status nor conditions.
    pub fn has_conditions(&self) -> bool {
        self.status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .is_some()
    }

    /// Marks every condition of the given type as `False`.
    ///
    /// Returns `false` without touching the record if it has no conditions
    /// collection.
    pub fn set_condition_false(&mut self, type_: &str) -> bool {
        let conditions = match self
            .status
            .as_mut()
            .and_then(|status| status.conditions.as_mut())
        {
            Some(conditions) => conditions,
            None => return false,
        };

        conditions
            .iter_mut()
            .filter(|condition| condition.type_ == type_)
            .for_each(|condition| condition.status = ClusterCondition::STATUS_FALSE.into());
        true
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<ClusterCondition>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ClusterCondition {
    pub const STATUS_FALSE: &'static str = "False";
    pub const STATUS_TRUE: &'static str = "True";
}
