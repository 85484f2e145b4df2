use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        core::v1::ConfigMap,
        rbac::v1::{ClusterRoleBinding, RoleRef, Subject},
    },
    apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference},
};
use kube::{Resource, ResourceExt};
use rancherd_api::{global_role_binding::GlobalRoleBinding, labels, user::User};
use rancherd_store::ResourceStore;
use tracing::{debug, info, instrument, warn, Level};

use crate::{
    classify::{classify, BootstrapState},
    config::BootstrapConfig,
    credential::Credential,
    error::{Error, Result},
    report::BootstrapReport,
    server_url::resolve_server_url,
};

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Drives the cluster towards a single, fully bound bootstrap admin.
///
/// Every mutating step checks for an existing record first, so a failed run
/// can simply be repeated.
pub struct Reconciler<'a, S>
where
    S: ?Sized,
{
    store: &'a S,
    config: &'a BootstrapConfig,
}

impl<'a, S> Reconciler<'a, S>
where
    S: ?Sized + ResourceStore,
{
    pub fn new(store: &'a S, config: &'a BootstrapConfig) -> Self {
        Self { store, config }
    }

    #[instrument(level = Level::INFO, skip_all, err(Display))]
    pub async fn run(&self, credential: &Credential) -> Result<BootstrapReport> {
        match classify(self.store, self.config).await? {
            BootstrapState::AlreadyBootstrapped => self.reset(credential).await,
            BootstrapState::NeverBootstrapped => self.bootstrap(credential).await,
        }
    }

    /// Replaces the password of the one and only bootstrap admin.
    #[instrument(level = Level::INFO, skip_all, err(Display))]
    pub async fn reset(&self, credential: &Credential) -> Result<BootstrapReport> {
        let labels = self.config.admin_labels();
        let mut admins = self.store.list_users(&labels).await?;

        if admins.len() != 1 {
            return Err(Error::AmbiguousState {
                count: admins.len(),
                selector: labels::to_selector(&labels),
                users: admins.iter().map(ResourceExt::name_any).collect(),
            });
        }

        let mut admin = admins.remove(0);
        admin.password = credential.hash()?;
        admin.must_change_password = false;

        let admin = self.store.update_user(&admin).await?;
        info!("reset the password of {name:?}", name = admin.name_any());

        Ok(BootstrapReport::Reset {
            username: admin.username,
            password: credential.password().into(),
        })
    }

    /// Creates (if needed) and wires up the bootstrap admin, then leaves the
    /// bootstrap marker behind.
    #[instrument(level = Level::INFO, skip_all, err(Display))]
    pub async fn bootstrap(&self, credential: &Credential) -> Result<BootstrapReport> {
        let labels = self.config.admin_labels();

        let admin_name = self.ensure_admin(&labels, credential).await?;
        self.stamp_cluster(&admin_name).await?;
        self.ensure_global_role_binding(&labels, &admin_name).await?;
        self.ensure_cluster_role_binding(&labels).await?;
        self.ensure_marker().await?;

        let server_url = resolve_server_url(self.store, self.config).await?;

        Ok(BootstrapReport::Created {
            username: self.config.admin_username.clone(),
            password: credential.password().into(),
            server_url,
        })
    }

    /// Returns the name of the bootstrap admin, creating one if none exists.
    async fn ensure_admin(
        &self,
        labels: &BTreeMap<String, String>,
        credential: &Credential,
    ) -> Result<String> {
        if let Some(admin) = self.store.list_users(labels).await?.first() {
            let name = admin.name_any();
            info!("found the default admin {name:?}; skipping creation");
            return Ok(name);
        }

        let user = User {
            metadata: ObjectMeta {
                generate_name: Some(self.config.admin_generate_name.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            display_name: self.config.admin_display_name.clone(),
            username: self.config.admin_username.clone(),
            password: credential.hash()?,
            must_change_password: credential.must_change_password(),
            extra: Default::default(),
        };

        match self.store.create_user(&user).await {
            Ok(admin) => {
                let name = admin.name_any();
                info!("created the default admin {name:?}");
                Ok(name)
            }
            Err(error) if error.is_already_exists() => {
                warn!("the default admin already exists: {error}");
                Ok(self
                    .store
                    .list_users(labels)
                    .await?
                    .first()
                    .map(ResourceExt::name_any)
                    .unwrap_or_default())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Makes the admin the creator of the local cluster.
    ///
    /// The ownership conditions are reset so that the platform controller
    /// re-assigns the cluster to the admin.
    async fn stamp_cluster(&self, admin_name: &str) -> Result<()> {
        let mut cluster = match self.store.get_cluster(&self.config.cluster_name).await {
            Ok(cluster) => cluster,
            Err(error) if error.is_not_found() => {
                return Err(Error::NotReady("local cluster is not ready yet"))
            }
            Err(error) => return Err(error.into()),
        };
        if admin_name.is_empty() {
            return Err(Error::NotReady("user is not set yet"));
        }

        cluster
            .annotations_mut()
            .insert(self.config.creator_annotation.clone(), admin_name.into());

        if cluster.has_conditions() {
            for type_ in &self.config.reset_conditions {
                cluster.set_condition_false(type_);
            }
        } else {
            debug!("the local cluster has no conditions yet; skipping reset");
        }

        self.store.update_cluster(&cluster).await?;
        info!("set the creator of the local cluster to {admin_name:?}");
        Ok(())
    }

    async fn ensure_global_role_binding(
        &self,
        labels: &BTreeMap<String, String>,
        admin_name: &str,
    ) -> Result<()> {
        if !self
            .store
            .list_global_role_bindings(labels)
            .await?
            .is_empty()
        {
            debug!("found the global role binding of the default admin");
            return Ok(());
        }

        let binding = GlobalRoleBinding {
            metadata: ObjectMeta {
                generate_name: Some(self.config.global_role_binding_generate_name.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            user_name: admin_name.into(),
            global_role_name: self.config.global_role_name.clone(),
            extra: Default::default(),
        };

        let binding = self.store.create_global_role_binding(&binding).await?;
        info!("created the global role binding {:?}", binding.name_any());
        Ok(())
    }

    async fn ensure_cluster_role_binding(&self, labels: &BTreeMap<String, String>) -> Result<()> {
        // re-read: the admin may have been created just now
        let admins = self.store.list_users(labels).await?;

        if !self
            .store
            .list_cluster_role_bindings(labels)
            .await?
            .is_empty()
        {
            debug!("found the cluster role binding of the default admin");
            return Ok(());
        }
        let admin = match admins.first() {
            Some(admin) => admin,
            None => {
                warn!("no default admin to bind the cluster role to");
                return Ok(());
            }
        };

        let binding = ClusterRoleBinding {
            metadata: ObjectMeta {
                generate_name: Some(self.config.cluster_role_binding_generate_name.clone()),
                labels: Some(labels.clone()),
                owner_references: Some(vec![OwnerReference {
                    api_version: User::api_version(&()).into_owned(),
                    kind: User::kind(&()).into_owned(),
                    name: admin.name_any(),
                    uid: admin.uid().unwrap_or_default(),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.into(),
                kind: "ClusterRole".into(),
                name: self.config.cluster_role_name.clone(),
            },
            subjects: Some(vec![Subject {
                api_group: Some(RBAC_API_GROUP.into()),
                kind: "User".into(),
                name: admin.name_any(),
                namespace: None,
            }]),
        };

        let binding = self.store.create_cluster_role_binding(&binding).await?;
        info!("created the cluster role binding {:?}", binding.name_any());
        Ok(())
    }

    async fn ensure_marker(&self) -> Result<()> {
        let marker = ConfigMap {
            metadata: ObjectMeta {
                namespace: Some(self.config.namespace.clone()),
                name: Some(self.config.marker_name.clone()),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.store.create_config_map(&marker).await {
            Ok(_) => {
                info!("marked the cluster as bootstrapped");
                Ok(())
            }
            Err(error) if error.is_already_exists() => {
                debug!("the bootstrap marker already exists");
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}
