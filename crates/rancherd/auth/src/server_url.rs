use k8s_openapi::api::core::v1::Node;
use rancherd_store::ResourceStore;
use tracing::{debug, instrument, Level};

use crate::{
    config::{BootstrapConfig, ADDRESS_PLACEHOLDER},
    error::Result,
};

const ADDRESS_EXTERNAL_IP: &str = "ExternalIP";
const ADDRESS_INTERNAL_IP: &str = "InternalIP";

/// Resolves the URL the new admin should log in at.
///
/// The server URL setting wins (its value, then its default); otherwise the
/// URL is guessed from the first node.
#[instrument(level = Level::INFO, skip_all, err(Display))]
pub async fn resolve_server_url<S>(store: &S, config: &BootstrapConfig) -> Result<String>
where
    S: ?Sized + ResourceStore,
{
    let setting = store.get_setting(&config.server_url_setting).await?;
    if let Some(value) = setting.effective_value() {
        debug!("using the server URL setting");
        return Ok(value.into());
    }

    let nodes = store.list_nodes().await?;
    Ok(guess_server_url(&config.server_url_template, nodes.first()))
}

/// Substitutes a node address into the template.
///
/// The first external IP wins; otherwise the last internal IP is used. With
/// no usable address the template is returned as is.
pub fn guess_server_url(template: &str, node: Option<&Node>) -> String {
    let addresses = node
        .and_then(|node| node.status.as_ref())
        .and_then(|status| status.addresses.as_ref());

    let mut chosen = None;
    for address in addresses.into_iter().flatten() {
        match address.type_.as_str() {
            ADDRESS_EXTERNAL_IP => {
                chosen = Some(address.address.as_str());
                break;
            }
            ADDRESS_INTERNAL_IP => chosen = Some(address.address.as_str()),
            _ => continue,
        }
    }

    match chosen {
        Some(address) => template.replace(ADDRESS_PLACEHOLDER, address),
        None => template.into(),
    }
}
