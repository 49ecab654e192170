use thiserror::Error;

use fleet_broker::BrokerError;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status store query failed: {0}")]
    Store(#[source] sqlx::Error),
    #[error("messaging fabric error: {0}")]
    Broker(#[from] BrokerError),
}
