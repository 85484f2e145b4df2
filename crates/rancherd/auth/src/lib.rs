pub mod classify;
pub mod config;
pub mod credential;
pub mod error;
pub mod reconcile;
pub mod report;
pub mod server_url;

use anyhow::{Context, Result};
use rancherd_store::ResourceStore;
use tracing::{instrument, Level};

use crate::{
    config::BootstrapConfig, credential::CredentialSource, reconcile::Reconciler,
    report::BootstrapReport,
};

pub const NOT_READY_HINT: &str = "cluster and rancher are not ready. Please try later.";

/// Bootstraps the default admin, or resets its password if the cluster has
/// already been bootstrapped.
#[instrument(level = Level::INFO, skip_all, err(Display))]
pub async fn reset_admin<S>(
    store: &S,
    config: &BootstrapConfig,
    source: CredentialSource,
) -> Result<BootstrapReport>
where
    S: ?Sized + ResourceStore,
{
    let credential = source.resolve().await.context(NOT_READY_HINT)?;
    Reconciler::new(store, config)
        .run(&credential)
        .await
        .context(NOT_READY_HINT)
}
