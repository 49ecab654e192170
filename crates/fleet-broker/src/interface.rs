use async_trait::async_trait;

use crate::error::BrokerError;

/// What a Server/Worker/Status Processor needs from a publisher,
/// independent of whether it is backed by a real broker channel or the
/// in-memory fake used in tests.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, body: &[u8]) -> Result<(), BrokerError>;
    async fn shutdown(&self);
}

/// What a consumer needs from a subscriber. `consume()` never blocks —
/// it drains whatever has already been received and acked.
#[async_trait]
pub trait MessageSubscriber: Send + Sync {
    async fn consume(&self) -> Vec<Vec<u8>>;
    async fn shutdown(&self);
}

#[async_trait]
impl MessagePublisher for crate::publisher::Publisher {
    async fn publish(&self, body: &[u8]) -> Result<(), BrokerError> {
        crate::publisher::Publisher::publish(self, body).await
    }

    async fn shutdown(&self) {
        crate::publisher::Publisher::shutdown(self).await
    }
}

#[async_trait]
impl MessageSubscriber for crate::subscriber::Subscriber {
    async fn consume(&self) -> Vec<Vec<u8>> {
        crate::subscriber::Subscriber::consume(self).await
    }

    async fn shutdown(&self) {
        crate::subscriber::Subscriber::shutdown(self).await
    }
}
