use rancherd_store::ResourceStore;
use strum::Display;
use tracing::{debug, instrument, Level};

use crate::{config::BootstrapConfig, error::Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum BootstrapState {
    /// No bootstrap marker; there may still be a labeled admin left by an
    /// interrupted run.
    NeverBootstrapped,
    AlreadyBootstrapped,
}

/// Looks up the bootstrap marker.
///
/// Only a missing marker is tolerated; any other failure aborts.
#[instrument(level = Level::INFO, skip_all, err(Display))]
pub async fn classify<S>(store: &S, config: &BootstrapConfig) -> Result<BootstrapState>
where
    S: ?Sized + ResourceStore,
{
    let state = match store
        .get_config_map(&config.namespace, &config.marker_name)
        .await
    {
        Ok(_) => BootstrapState::AlreadyBootstrapped,
        Err(error) if error.is_not_found() => BootstrapState::NeverBootstrapped,
        Err(error) => return Err(error.into()),
    };

    debug!("bootstrap state: {state}");
    Ok(state)
}
