pub mod cluster;
pub mod global_role_binding;
pub mod labels;
pub mod setting;
pub mod user;

pub mod consts {
    pub const GROUP: &str = "management.cattle.io";
    pub const VERSION: &str = "v3";
}

macro_rules! impl_management_resource {
    ( $ty:ty, $kind:literal, $plural:literal ) => {
        impl ::kube::Resource for $ty {
            type DynamicType = ();
            type Scope = ::k8s_openapi::ClusterResourceScope;

            fn kind(_: &()) -> ::std::borrow::Cow<'_, str> {
                $kind.into()
            }

            fn group(_: &()) -> ::std::borrow::Cow<'_, str> {
                crate::consts::GROUP.into()
            }

            fn version(_: &()) -> ::std::borrow::Cow<'_, str> {
                crate::consts::VERSION.into()
            }

            fn plural(_: &()) -> ::std::borrow::Cow<'_, str> {
                $plural.into()
            }

            fn meta(&self) -> &::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(
                &mut self,
            ) -> &mut ::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

impl_management_resource!(self::cluster::Cluster, "Cluster", "clusters");
impl_management_resource!(
    self::global_role_binding::GlobalRoleBinding,
    "GlobalRoleBinding",
    "globalrolebindings"
);
impl_management_resource!(self::setting::Setting, "Setting", "settings");
impl_management_resource!(self::user::User, "User", "users");
