use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use k8s_openapi::api::{
    core::v1::{ConfigMap, Node},
    rbac::v1::ClusterRoleBinding,
};
use kube::{Resource, ResourceExt};
use rancherd_api::{
    cluster::Cluster, global_role_binding::GlobalRoleBinding, labels, setting::Setting, user::User,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{namespace_of, ResourceStore, Result, StoreError, Verb};

/// An in-process [`ResourceStore`] with API-server-like semantics.
///
/// Records keep their insertion order. Created records get a name (from
/// `generateName` when needed), a uid and a resource version; updates are
/// rejected when the given resource version is stale.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
pub struct MemoryState {
    calls: usize,
    counters: BTreeMap<(Verb, String), usize>,
    failures: BTreeSet<(Verb, String)>,
    failures_nth: BTreeSet<(Verb, String, usize)>,
    serial: u64,

    cluster_role_bindings: Vec<ClusterRoleBinding>,
    clusters: Vec<Cluster>,
    config_maps: Vec<ConfigMap>,
    global_role_bindings: Vec<GlobalRoleBinding>,
    nodes: Vec<Node>,
    settings: Vec<Setting>,
    users: Vec<User>,
}

/// A record kind the [`MemoryStore`] keeps a collection of.
pub trait MemoryResource: Resource<DynamicType = ()> + Clone + Send + 'static {
    const NAMESPACED: bool = false;

    fn collection(state: &mut MemoryState) -> &mut Vec<Self>;
}

macro_rules! impl_memory_resource {
    ( $ty:ty => $field:ident ) => {
        impl_memory_resource!($ty => $field, false);
    };
    ( $ty:ty => $field:ident, namespaced ) => {
        impl_memory_resource!($ty => $field, true);
    };
    ( $ty:ty => $field:ident, $namespaced:literal ) => {
        impl MemoryResource for $ty {
            const NAMESPACED: bool = $namespaced;

            fn collection(state: &mut MemoryState) -> &mut Vec<Self> {
                &mut state.$field
            }
        }
    };
}

impl_memory_resource!(ClusterRoleBinding => cluster_role_bindings);
impl_memory_resource!(Cluster => clusters);
impl_memory_resource!(ConfigMap => config_maps, namespaced);
impl_memory_resource!(GlobalRoleBinding => global_role_bindings);
impl_memory_resource!(Node => nodes);
impl_memory_resource!(Setting => settings);
impl_memory_resource!(User => users);

#[derive(Debug, Error)]
#[error("{0}")]
pub struct MemoryError(String);

impl MemoryStore {
    /// Seeds a record, bypassing the call counter and injected failures.
    pub fn insert<K>(&self, record: K) -> Result<K>
    where
        K: MemoryResource,
    {
        let mut state = self.lock();
        create(&mut state, &record)
    }

    /// Returns a copy of every record of the given kind.
    pub fn snapshot<K>(&self) -> Vec<K>
    where
        K: MemoryResource,
    {
        K::collection(&mut self.lock()).clone()
    }

    /// Deletes a record, returning it if it existed.
    pub fn remove<K>(&self, namespace: Option<&str>, name: &str) -> Option<K>
    where
        K: MemoryResource,
    {
        let mut state = self.lock();
        let items = K::collection(&mut state);
        let index = items
            .iter()
            .position(|item| is_same(item, namespace, name))?;
        Some(items.remove(index))
    }

    /// Makes every following `verb` on the `kind` collection fail.
    pub fn fail_on(&self, verb: Verb, kind: &str) {
        self.lock().failures.insert((verb, kind.into()));
    }

    /// Makes only the `nth` (1-based) `verb` on the `kind` collection fail.
    pub fn fail_on_nth(&self, verb: Verb, kind: &str, nth: usize) {
        self.lock().failures_nth.insert((verb, kind.into(), nth));
    }

    /// Number of store operations served so far (seeding excluded).
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter<K>(&self, verb: Verb) -> Result<MutexGuard<'_, MemoryState>>
    where
        K: MemoryResource,
    {
        let mut state = self.lock();
        state.calls += 1;

        let kind = kind::<K>();
        let key = (verb, kind.to_string());
        let count = {
            let counter = state.counters.entry(key.clone()).or_default();
            *counter += 1;
            *counter
        };
        if state.failures.contains(&key) || state.failures_nth.contains(&(verb, key.1, count)) {
            return Err(StoreError::Backend {
                verb,
                kind,
                source: MemoryError("injected failure".into()).into(),
            });
        }
        Ok(state)
    }

    fn list<K>(&self, selector: &BTreeMap<String, String>) -> Result<Vec<K>>
    where
        K: MemoryResource,
    {
        let mut state = self.enter::<K>(Verb::List)?;
        Ok(K::collection(&mut state)
            .iter()
            .filter(|item| labels::matches(item.meta().labels.as_ref(), selector))
            .cloned()
            .collect())
    }

    fn get<K>(&self, namespace: Option<&str>, name: &str) -> Result<K>
    where
        K: MemoryResource,
    {
        let mut state = self.enter::<K>(Verb::Get)?;
        K::collection(&mut state)
            .iter()
            .find(|item| is_same(*item, namespace, name))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: kind::<K>(),
                name: name.into(),
            })
    }

    fn create<K>(&self, record: &K) -> Result<K>
    where
        K: MemoryResource,
    {
        let mut state = self.enter::<K>(Verb::Create)?;
        create(&mut state, record)
    }

    fn update<K>(&self, record: &K) -> Result<K>
    where
        K: MemoryResource,
    {
        let mut state = self.enter::<K>(Verb::Update)?;

        let name = record.name_any();
        let namespace = record.namespace();
        let stored = K::collection(&mut state)
            .iter_mut()
            .find(|item| is_same(&**item, namespace.as_deref(), &name))
            .ok_or_else(|| StoreError::NotFound {
                kind: kind::<K>(),
                name: name.clone(),
            })?;

        let version = stored.resource_version();
        if record.meta().resource_version.is_some() && record.resource_version() != version {
            return Err(StoreError::Conflict {
                kind: kind::<K>(),
                name,
            });
        }

        let mut updated = record.clone();
        let metadata = updated.meta_mut();
        metadata.resource_version = Some(next_version(version.as_deref()));
        metadata.uid.clone_from(&stored.meta().uid);
        *stored = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn list_users(&self, labels: &BTreeMap<String, String>) -> Result<Vec<User>> {
        self.list(labels)
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        self.create(user)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        self.update(user)
    }

    async fn list_global_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<GlobalRoleBinding>> {
        self.list(labels)
    }

    async fn create_global_role_binding(
        &self,
        binding: &GlobalRoleBinding,
    ) -> Result<GlobalRoleBinding> {
        self.create(binding)
    }

    async fn list_cluster_role_bindings(
        &self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterRoleBinding>> {
        self.list(labels)
    }

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding> {
        self.create(binding)
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster> {
        self.get(None, name)
    }

    async fn update_cluster(&self, cluster: &Cluster) -> Result<Cluster> {
        self.update(cluster)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<ConfigMap> {
        self.get(Some(namespace), name)
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        self.create(config_map)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.list(&BTreeMap::default())
    }

    async fn get_setting(&self, name: &str) -> Result<Setting> {
        self.get(None, name)
    }
}

fn kind<K>() -> Cow<'static, str>
where
    K: Resource<DynamicType = ()>,
{
    K::plural(&()).into_owned().into()
}

fn is_same<K>(item: &K, namespace: Option<&str>, name: &str) -> bool
where
    K: Resource,
{
    let metadata = item.meta();
    metadata.namespace.as_deref() == namespace && metadata.name.as_deref() == Some(name)
}

fn next_version(version: Option<&str>) -> String {
    let version: u64 = version
        .and_then(|version| version.parse().ok())
        .unwrap_or_default();
    (version + 1).to_string()
}

fn create<K>(state: &mut MemoryState, record: &K) -> Result<K>
where
    K: MemoryResource,
{
    if K::NAMESPACED {
        namespace_of(record)?;
    }

    let mut created = record.clone();
    let metadata = created.meta_mut();

    let name = match (metadata.name.clone(), metadata.generate_name.as_ref()) {
        (Some(name), _) => name,
        (None, Some(prefix)) => {
            state.serial += 1;
            format!("{prefix}{:05}", state.serial)
        }
        (None, None) => {
            return Err(StoreError::Backend {
                verb: Verb::Create,
                kind: kind::<K>(),
                source: MemoryError("name or generateName is required".into()).into(),
            })
        }
    };
    metadata.name = Some(name.clone());
    metadata.resource_version = Some(next_version(None));
    metadata.uid = Some(Uuid::new_v4().to_string());

    let namespace = metadata.namespace.clone();
    let items = K::collection(state);
    if items
        .iter()
        .any(|item| is_same(item, namespace.as_deref(), &name))
    {
        return Err(StoreError::AlreadyExists {
            kind: kind::<K>(),
            name,
        });
    }

    items.push(created.clone());
    Ok(created)
}
