use thiserror::Error;

use fleet_broker::BrokerError;
use fleet_dal_client::DalError;
use fleet_server::ServerError;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker dal call failed: {0}")]
    Dal(#[from] DalError),
    #[error("messaging fabric error: {0}")]
    Broker(#[from] BrokerError),
    #[error("server supervisor error: {0}")]
    Server(#[from] ServerError),
}
