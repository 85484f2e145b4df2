#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "memory")]
pub mod memory;

use std::{borrow::Cow, collections::BTreeMap};

use async_trait::async_trait;
use k8s_openapi::api::{
    core::v1::{ConfigMap, Node},
    rbac::v1::ClusterRoleBinding,
};
use rancherd_api::{
    cluster::Cluster, global_role_binding::GlobalRoleBinding, setting::Setting, user::User,
};
use strum::Display;
use thiserror::Error;

pub type Result<T, E = StoreError> = ::core::result::Result<T, E>;

/// Typed access to the resource collections touched by the admin bootstrap.
///
/// `list_*` never fails on an empty result. `get_*` fails with
/// [`StoreError::NotFound`] and `create_*` with [`StoreError::AlreadyExists`],
/// so callers can tell those apart from every other failure.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn list_users(&self, labels: &BTreeMap<String, String>) -> Result<Vec<User>>;

    async fn create_user(&self, user: &User) -> Result<User>;

    async fn update_user(&self, user: &User) -> Result<User>;

    async fn list_global_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<GlobalRoleBinding>>;

    async fn create_global_role_binding(
        &self,
        binding: &GlobalRoleBinding,
    ) -> Result<GlobalRoleBinding>;

    async fn list_cluster_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterRoleBinding>>;

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding>;

    async fn get_cluster(&self, name: &str) -> Result<Cluster>;

    async fn update_cluster(&self, cluster: &Cluster) -> Result<Cluster>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap>;

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn get_setting(&self, name: &str) -> Result<Setting>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Verb {
    List,
    Get,
    Create,
    Update,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {name:?} was not found")]
    NotFound {
        kind: Cow<'static, str>,
        name: String,
    },

    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        kind: Cow<'static, str>,
        name: String,
    },

    #[error("{kind} {name:?} has been modified concurrently")]
    Conflict {
        kind: Cow<'static, str>,
        name: String,
    },

    #[error("{kind} {name:?} has no namespace")]
    MissingNamespace {
        kind: Cow<'static, str>,
        name: String,
    },

    #[error("malformed {kind}: {source}")]
    Malformed {
        kind: Cow<'static, str>,
        #[source]
        source: ::serde_json::Error,
    },

    #[error("failed to {verb} {kind}: {source}")]
    Backend {
        verb: Verb,
        kind: Cow<'static, str>,
        #[source]
        source: Box<dyn ::std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// The namespace a namespaced record is written into.
///
/// There is no fallback namespace: a record without one is rejected.
#[cfg(any(feature = "client", feature = "memory"))]
fn namespace_of<K>(record: &K) -> Result<String>
where
    K: ::kube::Resource<DynamicType = ()>,
{
    let metadata = record.meta();
    metadata
        .namespace
        .clone()
        .filter(|namespace| !namespace.is_empty())
        .ok_or_else(|| StoreError::MissingNamespace {
            kind: K::plural(&()).into_owned().into(),
            name: metadata
                .name
                .clone()
                .or_else(|| metadata.generate_name.clone())
                .unwrap_or_default(),
        })
}

#[cfg(all(test, any(feature = "client", feature = "memory")))]
mod tests {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use super::*;

    #[test]
    fn require_namespace() {
        let mut marker = ConfigMap {
            metadata: ObjectMeta {
                name: Some("admincreated".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let error = namespace_of(&marker).unwrap_err();
        assert!(matches!(error, StoreError::MissingNamespace { .. }));
        assert_eq!(
            error.to_string(),
            "configmaps \"admincreated\" has no namespace",
        );

        marker.metadata.namespace = Some("cattle-system".into());
        assert_eq!(namespace_of(&marker).unwrap(), "cattle-system");
    }
}
