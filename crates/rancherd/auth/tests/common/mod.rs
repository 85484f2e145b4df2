#![allow(dead_code)]

use k8s_openapi::{
    api::core::v1::{ConfigMap, Node, NodeAddress, NodeStatus},
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};
use rancherd_api::{
    cluster::{Cluster, ClusterCondition, ClusterStatus},
    setting::Setting,
    user::User,
};
use rancherd_auth::{
    config::BootstrapConfig,
    credential::{hash_password, Credential, CredentialSource},
};
use rancherd_store::memory::MemoryStore;

pub async fn explicit(password: &str) -> Credential {
    CredentialSource::Explicit(password.into())
        .resolve()
        .await
        .unwrap()
}

pub fn condition(type_: &str, status: &str) -> ClusterCondition {
    ClusterCondition {
        type_: type_.into(),
        status: status.into(),
        extra: Default::default(),
    }
}

/// Seeds the local cluster, optionally with a conditions collection.
pub fn seed_cluster(store: &MemoryStore, config: &BootstrapConfig, conditions: bool) -> Cluster {
    let status = conditions.then(|| ClusterStatus {
        conditions: Some(vec![
            condition("Ready", ClusterCondition::STATUS_TRUE),
            condition("CreatorMadeOwner", ClusterCondition::STATUS_TRUE),
            condition("DefaultProjectCreated", ClusterCondition::STATUS_TRUE),
        ]),
        ..Default::default()
    });

    store
        .insert(Cluster {
            metadata: ObjectMeta {
                name: Some(config.cluster_name.clone()),
                ..Default::default()
            },
            status,
            extra: Default::default(),
        })
        .unwrap()
}

pub fn seed_setting(store: &MemoryStore, config: &BootstrapConfig, value: &str, default: &str) {
    store
        .insert(Setting {
            metadata: ObjectMeta {
                name: Some(config.server_url_setting.clone()),
                ..Default::default()
            },
            value: value.into(),
            default: default.into(),
            extra: Default::default(),
        })
        .unwrap();
}

pub fn seed_node(store: &MemoryStore, name: &str, addresses: &[(&str, &str)]) {
    store
        .insert(Node {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            status: Some(NodeStatus {
                addresses: Some(
                    addresses
                        .iter()
                        .map(|&(type_, address)| NodeAddress {
                            type_: type_.into(),
                            address: address.into(),
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        })
        .unwrap();
}

/// Seeds a labeled admin whose password is `old-password`.
pub fn seed_admin(store: &MemoryStore, config: &BootstrapConfig, name: &str) -> User {
    store
        .insert(User {
            metadata: ObjectMeta {
                name: Some(name.into()),
                labels: Some(config.admin_labels()),
                ..Default::default()
            },
            display_name: config.admin_display_name.clone(),
            username: config.admin_username.clone(),
            password: hash_password("old-password").unwrap(),
            must_change_password: true,
            extra: Default::default(),
        })
        .unwrap()
}

pub fn seed_marker(store: &MemoryStore, config: &BootstrapConfig) {
    store
        .insert(ConfigMap {
            metadata: ObjectMeta {
                namespace: Some(config.namespace.clone()),
                name: Some(config.marker_name.clone()),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
}

/// A cluster the bootstrap can run against from scratch.
pub fn fresh_store(config: &BootstrapConfig) -> MemoryStore {
    let store = MemoryStore::default();
    seed_cluster(&store, config, true);
    seed_setting(&store, config, "https://rancher.example.com", "");
    store
}
