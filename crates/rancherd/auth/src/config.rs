use std::collections::BTreeMap;

/// Names and labels of the records the bootstrap reconciles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Namespace of the bootstrap marker.
    pub namespace: String,
    /// Name of the config map whose existence means "already bootstrapped".
    pub marker_name: String,

    pub admin_label_key: String,
    pub admin_label_value: String,
    pub admin_display_name: String,
    pub admin_generate_name: String,
    pub admin_username: String,

    pub global_role_name: String,
    pub global_role_binding_generate_name: String,

    pub cluster_role_name: String,
    pub cluster_role_binding_generate_name: String,

    /// Name of the record representing the local cluster.
    pub cluster_name: String,
    pub creator_annotation: String,
    /// Conditions forced to `False` so that the platform re-assigns the
    /// cluster ownership to the new admin.
    pub reset_conditions: Vec<String>,

    pub server_url_setting: String,
    /// Login URL guessed from a node address; `{address}` is substituted.
    pub server_url_template: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            namespace: "cattle-system".into(),
            marker_name: "admincreated".into(),
            admin_label_key: "authz.management.cattle.io/bootstrapping".into(),
            admin_label_value: "admin-user".into(),
            admin_display_name: "Default Admin".into(),
            admin_generate_name: "user-".into(),
            admin_username: "admin".into(),
            global_role_name: "admin".into(),
            global_role_binding_generate_name: "globalrolebinding-".into(),
            cluster_role_name: "cluster-admin".into(),
            cluster_role_binding_generate_name: "default-admin-".into(),
            cluster_name: "local".into(),
            creator_annotation: "field.cattle.io/creatorId".into(),
            reset_conditions: vec![
                "DefaultProjectCreated".into(),
                "SystemProjectCreated".into(),
                "CreatorMadeOwner".into(),
            ],
            server_url_setting: "server-url".into(),
            server_url_template: format!("https://{ADDRESS_PLACEHOLDER}:8443"),
        }
    }
}

impl BootstrapConfig {
    /// Labels carried by the admin account and its bindings.
    pub fn admin_labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::default();
        labels.insert(self.admin_label_key.clone(), self.admin_label_value.clone());
        labels
    }
}

pub const ADDRESS_PLACEHOLDER: &str = "{address}";
