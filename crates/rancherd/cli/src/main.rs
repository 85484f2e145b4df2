use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{value_parser, ArgAction, Parser, Subcommand};
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use rancherd_auth::{config::BootstrapConfig, credential::CredentialArgs, NOT_READY_HINT};
use rancherd_core::tracer;
use rancherd_store::client::KubeStore;
use tracing::{debug, instrument, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: ArgsCommon,

    #[command(subcommand)]
    command: Commands,
}

impl Args {
    async fn run(self) -> Result<()> {
        self.common.run();
        let result = self.command.run().await;
        tracer::shutdown();
        result
    }
}

#[derive(Parser)]
struct ArgsCommon {
    /// Turn debugging information on
    #[arg(short, long, action = ArgAction::Count)]
    #[arg(value_parser = value_parser!(u8).range(..=2))]
    debug: u8,
}

impl ArgsCommon {
    fn run(self) {
        tracer::init_once(self.debug, true)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the default admin, or reset its password
    ResetAdmin(CommandResetAdmin),
}

impl Commands {
    async fn run(self) -> Result<()> {
        match self {
            Self::ResetAdmin(command) => command.run().await,
        }
    }
}

#[derive(Parser)]
struct CommandResetAdmin {
    /// Set the new admin password
    #[arg(long, env = "RANCHERD_PASSWORD", value_name = "PASSWORD")]
    password: Option<String>,

    /// Read the new admin password from a file
    #[arg(long, env = "RANCHERD_PASSWORD_FILE", value_name = "PATH")]
    password_file: Option<PathBuf>,

    /// Set a kubeconfig of the local cluster
    #[arg(
        long,
        env = "KUBECONFIG",
        value_name = "PATH",
        default_value = "/etc/rancher/rke2/rke2.yaml"
    )]
    kubeconfig: PathBuf,
}

impl CommandResetAdmin {
    async fn run(self) -> Result<()> {
        let Self {
            password,
            password_file,
            kubeconfig,
        } = self;

        // reject bad options before touching the cluster
        let source = CredentialArgs {
            password,
            password_file,
        }
        .validate()?;

        let kube = load_client(kubeconfig).await.context(NOT_READY_HINT)?;
        let store = KubeStore::new(kube);
        let config = BootstrapConfig::default();

        let report = ::rancherd_auth::reset_admin(&store, &config, source).await?;
        report.emit();
        Ok(())
    }
}

#[instrument(level = Level::INFO, err(Display))]
async fn load_client(path: PathBuf) -> Result<Client> {
    debug!("loading the kubeconfig");
    let kubeconfig = Kubeconfig::read_from(&path)
        .with_context(|| format!("failed to read the kubeconfig {path:?}"))?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .context("failed to load the kubeconfig")?;
    Client::try_from(config).context("failed to create a kubernetes client")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    Args::parse().run().await
}
