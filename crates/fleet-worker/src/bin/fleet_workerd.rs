//! Worker Service Loop binary entry point: registers a Worker row,
//! connects the broker, and runs the command/heartbeat loop until a
//! cascading shutdown completes.

use std::sync::Arc;

use fleet_broker::{BrokerConfig, BrokerFabric, RobustConnection};
use fleet_core::{Clock, SystemClock};
use fleet_dal_client::{DalClient, DalConfig, WorkerDal};
use fleet_installer::{Installer, InstallerCredential, RealInstaller};
use fleet_process::{ExternalProcess, RealExternalProcess};
use fleet_worker::{WorkerConfig, WorkerLoop};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "fleet-workerd exited with an error");
        return Err(err);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let worker_config = WorkerConfig::from_env()?;
    let dal_config = DalConfig::from_env()?;
    let broker_config = BrokerConfig::from_env()?;
    let installer_binary = std::env::var("FLEET_WORKER_INSTALLER_BINARY")?;

    info!("connecting to the worker DAL");
    let dal: Arc<dyn WorkerDal> = Arc::new(DalClient::new(dal_config)?);

    info!("connecting to the broker");
    let connection = RobustConnection::connect(broker_config).await?;
    let fabric = Arc::new(BrokerFabric::new(connection));

    let installer: Arc<dyn Installer> =
        Arc::new(RealInstaller::new(installer_binary).with_credential(installer_credential_from_env()));
    let external_process: Arc<dyn ExternalProcess> = Arc::new(RealExternalProcess);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let worker_loop = WorkerLoop::create(&worker_config, dal, installer, external_process, clock, fabric).await?;

    info!("worker loop starting");
    worker_loop.run().await;
    Ok(())
}

/// Most catalog content is fetched anonymously; a real account is only
/// needed for the minority of configured games that require one.
fn installer_credential_from_env() -> InstallerCredential {
    match (
        std::env::var("FLEET_INSTALLER_USERNAME"),
        std::env::var("FLEET_INSTALLER_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => InstallerCredential::UserPassword { username, password },
        _ => InstallerCredential::Anonymous,
    }
}
