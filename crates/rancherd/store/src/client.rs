use std::{borrow::Cow, collections::BTreeMap};

use async_trait::async_trait;
use k8s_openapi::api::{
    core::v1::{ConfigMap, Node},
    rbac::v1::ClusterRoleBinding,
};
use kube::{
    api::{Api, ApiResource, DynamicObject, ListParams, PostParams},
    core::TypeMeta,
    Client, Resource, ResourceExt,
};
use rancherd_api::{
    cluster::Cluster, global_role_binding::GlobalRoleBinding, labels, setting::Setting, user::User,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, Level};

use crate::{namespace_of, ResourceStore, Result, StoreError, Verb};

/// A [`ResourceStore`] backed by the Kubernetes API server.
///
/// The `management.cattle.io` resources are not described by `k8s-openapi`,
/// so they travel as [`DynamicObject`]s and are converted to the typed
/// records here and nowhere else.
#[derive(Clone)]
pub struct KubeStore {
    kube: Client,
}

impl KubeStore {
    pub fn new(kube: Client) -> Self {
        Self { kube }
    }

    fn management_api<K>(&self) -> (Api<DynamicObject>, ApiResource)
    where
        K: Resource<DynamicType = ()>,
    {
        let ar = ApiResource::erase::<K>(&());
        let api = Api::all_with(self.kube.clone(), &ar);
        (api, ar)
    }

    async fn list_management<K>(&self, labels: &BTreeMap<String, String>) -> Result<Vec<K>>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let (api, _) = self.management_api::<K>();
        let lp = ListParams::default().labels(&labels::to_selector(labels));

        api.list(&lp)
            .await
            .map_err(|error| map_error(Verb::List, kind::<K>(), None, error))?
            .items
            .into_iter()
            .map(from_dynamic)
            .collect()
    }

    async fn get_management<K>(&self, name: &str) -> Result<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let (api, _) = self.management_api::<K>();

        api.get(name)
            .await
            .map_err(|error| map_error(Verb::Get, kind::<K>(), Some(name), error))
            .and_then(from_dynamic)
    }

    async fn create_management<K>(&self, record: &K) -> Result<K>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Sync,
    {
        let (api, ar) = self.management_api::<K>();
        let object = into_dynamic(&ar, record)?;
        let name = requested_name(record);

        api.create(&PostParams::default(), &object)
            .await
            .map_err(|error| map_error(Verb::Create, kind::<K>(), Some(&name), error))
            .and_then(from_dynamic)
    }

    async fn update_management<K>(&self, record: &K) -> Result<K>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned + Sync,
    {
        let (api, ar) = self.management_api::<K>();
        let object = into_dynamic(&ar, record)?;
        let name = record.name_any();

        api.replace(&name, &PostParams::default(), &object)
            .await
            .map_err(|error| map_error(Verb::Update, kind::<K>(), Some(&name), error))
            .and_then(from_dynamic)
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn list_users(&self, labels: &BTreeMap<String, String>) -> Result<Vec<User>> {
        self.list_management(labels).await
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn create_user(&self, user: &User) -> Result<User> {
        self.create_management(user).await
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(name = %user.name_any()), err(Display))]
    async fn update_user(&self, user: &User) -> Result<User> {
        self.update_management(user).await
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn list_global_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<GlobalRoleBinding>> {
        self.list_management(labels).await
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn create_global_role_binding(
        &self,
        binding: &GlobalRoleBinding,
    ) -> Result<GlobalRoleBinding> {
        self.create_management(binding).await
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn list_cluster_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterRoleBinding>> {
        let api = Api::<ClusterRoleBinding>::all(self.kube.clone());
        let lp = ListParams::default().labels(&labels::to_selector(labels));

        api.list(&lp)
            .await
            .map(|list| list.items)
            .map_err(|error| map_error(Verb::List, kind::<ClusterRoleBinding>(), None, error))
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding> {
        let api = Api::<ClusterRoleBinding>::all(self.kube.clone());
        let name = requested_name(binding);

        api.create(&PostParams::default(), binding)
            .await
            .map_err(|error| {
                map_error(
                    Verb::Create,
                    kind::<ClusterRoleBinding>(),
                    Some(&name),
                    error,
                )
            })
    }

    #[instrument(level = Level::DEBUG, skip(self), err(Display))]
    async fn get_cluster(&self, name: &str) -> Result<Cluster> {
        self.get_management(name).await
    }

    #[instrument(level = Level::DEBUG, skip_all, fields(name = %cluster.name_any()), err(Display))]
    async fn update_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.update_management(cluster).await
    }

    #[instrument(level = Level::DEBUG, skip(self), err(Display))]
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        let api = Api::<ConfigMap>::namespaced(self.kube.clone(), namespace);

        api.get(name)
            .await
            .map_err(|error| map_error(Verb::Get, kind::<ConfigMap>(), Some(name), error))
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        let namespace = namespace_of(config_map)?;
        let api = Api::<ConfigMap>::namespaced(self.kube.clone(), &namespace);
        let name = requested_name(config_map);

        api.create(&PostParams::default(), config_map)
            .await
            .map_err(|error| map_error(Verb::Create, kind::<ConfigMap>(), Some(&name), error))
    }

    #[instrument(level = Level::DEBUG, skip_all, err(Display))]
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api = Api::<Node>::all(self.kube.clone());
        let lp = ListParams::default();

        api.list(&lp)
            .await
            .map(|list| list.items)
            .map_err(|error| map_error(Verb::List, kind::<Node>(), None, error))
    }

    #[instrument(level = Level::DEBUG, skip(self), err(Display))]
    async fn get_setting(&self, name: &str) -> Result<Setting> {
        self.get_management(name).await
    }
}

fn kind<K>() -> Cow<'static, str>
where
    K: Resource<DynamicType = ()>,
{
    K::plural(&()).into_owned().into()
}

/// The name a create request asks for: the fixed name, else the prefix.
fn requested_name<K>(record: &K) -> String
where
    K: Resource,
{
    let metadata = record.meta();
    metadata
        .name
        .clone()
        .or_else(|| metadata.generate_name.clone())
        .unwrap_or_default()
}

fn map_error(
    verb: Verb,
    kind: Cow<'static, str>,
    name: Option<&str>,
    error: ::kube::Error,
) -> StoreError {
    match (name, error) {
        (Some(name), ::kube::Error::Api(response)) if response.code == 404 => {
            StoreError::NotFound {
                kind,
                name: name.into(),
            }
        }
        (Some(name), ::kube::Error::Api(response))
            if response.code == 409 && response.reason == "AlreadyExists" =>
        {
            StoreError::AlreadyExists {
                kind,
                name: name.into(),
            }
        }
        (Some(name), ::kube::Error::Api(response)) if response.code == 409 => {
            StoreError::Conflict {
                kind,
                name: name.into(),
            }
        }
        (_, error) => StoreError::Backend {
            verb,
            kind,
            source: error.into(),
        },
    }
}

fn from_dynamic<K>(object: DynamicObject) -> Result<K>
where
    K: Resource<DynamicType = ()> + DeserializeOwned,
{
    ::serde_json::to_value(object)
        .and_then(::serde_json::from_value)
        .map_err(|source| StoreError::Malformed {
            kind: kind::<K>(),
            source,
        })
}

fn into_dynamic<K>(ar: &ApiResource, record: &K) -> Result<DynamicObject>
where
    K: Resource<DynamicType = ()> + Serialize,
{
    let mut object: DynamicObject = ::serde_json::to_value(record)
        .and_then(::serde_json::from_value)
        .map_err(|source| StoreError::Malformed {
            kind: kind::<K>(),
            source,
        })?;
    object.types = Some(TypeMeta {
        api_version: ar.api_version.clone(),
        kind: ar.kind.clone(),
    });
    Ok(object)
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;
    use maplit::btreemap;
    use serde_json::json;

    use super::*;

    fn api_error(code: u16, reason: &str) -> ::kube::Error {
        ::kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} for test"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn map_api_errors() {
        let error = map_error(
            Verb::Get,
            kind::<ConfigMap>(),
            Some("admincreated"),
            api_error(404, "NotFound"),
        );
        assert!(error.is_not_found());

        let error = map_error(
            Verb::Create,
            kind::<ConfigMap>(),
            Some("admincreated"),
            api_error(409, "AlreadyExists"),
        );
        assert!(error.is_already_exists());

        let error = map_error(
            Verb::Update,
            kind::<User>(),
            Some("user-abcde"),
            api_error(409, "Conflict"),
        );
        assert!(matches!(error, StoreError::Conflict { .. }));

        let error = map_error(
            Verb::Get,
            kind::<Setting>(),
            Some("server-url"),
            api_error(403, "Forbidden"),
        );
        assert!(matches!(error, StoreError::Backend { verb: Verb::Get, .. }));
        assert!(error.to_string().starts_with("failed to get settings"));
    }

    #[test]
    fn map_list_not_found_to_backend() {
        // a missing collection means the CRDs are not installed yet
        let error = map_error(Verb::List, kind::<User>(), None, api_error(404, "NotFound"));
        assert!(!error.is_not_found());
    }

    #[test]
    fn convert_user_from_dynamic() {
        let ar = ApiResource::erase::<User>(&());
        let object = DynamicObject::new("user-abcde", &ar).data(json!({
            "displayName": "Default Admin",
            "username": "admin",
            "password": "hash",
            "mustChangePassword": true,
            "principalIds": ["local://user-abcde"],
        }));

        let user: User = from_dynamic(object).unwrap();
        assert_eq!(user.name_any(), "user-abcde");
        assert_eq!(user.username, "admin");
        assert!(user.must_change_password);
        assert_eq!(
            user.extra.get("principalIds"),
            Some(&json!(["local://user-abcde"])),
        );
    }

    #[test]
    fn convert_binding_into_dynamic() {
        let ar = ApiResource::erase::<GlobalRoleBinding>(&());
        let binding = GlobalRoleBinding {
            metadata: ::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                generate_name: Some("globalrolebinding-".into()),
                labels: Some(btreemap! {
                    "authz.management.cattle.io/bootstrapping".into() => "admin-user".into(),
                }),
                ..Default::default()
            },
            user_name: "user-abcde".into(),
            global_role_name: "admin".into(),
            extra: Default::default(),
        };

        let object = into_dynamic(&ar, &binding).unwrap();
        let types = object.types.as_ref().unwrap();
        assert_eq!(types.api_version, "management.cattle.io/v3");
        assert_eq!(types.kind, "GlobalRoleBinding");
        assert_eq!(object.data["userName"], json!("user-abcde"));
        assert_eq!(object.data["globalRoleName"], json!("admin"));
        assert_eq!(requested_name(&binding), "globalrolebinding-");
    }
}
