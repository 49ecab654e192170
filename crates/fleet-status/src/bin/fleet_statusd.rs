//! Status Processor binary entry point: connects the broker and the
//! database, then runs the heartbeat-timeout/status-ingest loop until
//! killed.

use std::sync::Arc;

use fleet_broker::{BrokerConfig, BrokerFabric, RobustConnection};
use fleet_status::{PgStatusRepository, StatusConfig, StatusProcessor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run().await {
        error!(error = %err, "fleet-statusd exited with an error");
        return Err(err);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let status_config = StatusConfig::from_env()?;
    let broker_config = BrokerConfig::from_env()?;

    info!("connecting to the database");
    let repo: Arc<dyn fleet_status::StatusRepository> = Arc::new(PgStatusRepository::connect(&status_config.database_url).await?);

    info!("connecting to the broker");
    let connection = RobustConnection::connect(broker_config).await?;
    let fabric = Arc::new(BrokerFabric::new(connection));

    let processor = StatusProcessor::create(&status_config, repo, fabric).await?;

    info!("status processor starting");
    processor.run().await;
    Ok(())
}
