use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("failed to connect to broker: {0}")]
    ConnectionFailed(#[source] lapin::Error),
    #[error("connection is closed")]
    ConnectionClosed,
    #[error("channel operation failed: {0}")]
    Channel(#[source] lapin::Error),
    #[error("reconnect attempts exhausted after {0} tries")]
    ReconnectExhausted(u32),
}
