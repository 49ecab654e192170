//! The capability interface a Server Supervisor, Worker Loop, or Status
//! Processor uses to stand up its publisher/subscriber pair, abstracted
//! over whether it's backed by a live `RobustConnection` or the
//! in-memory `FakeBroker` used in tests — the same capability-trait
//! pattern as `fleet_process::ExternalProcess` and
//! `fleet_installer::Installer`.

use std::sync::Arc;

use async_trait::async_trait;
use fleet_wire::{BindingConfig, QueueConfig};
use tracing::warn;

use crate::connection::{ConnectionState, RobustConnection};
use crate::error::BrokerError;
use crate::interface::{MessagePublisher, MessageSubscriber};
use crate::publisher::Publisher;
use crate::subscriber::Subscriber;

#[async_trait]
pub trait MessagingFabric: Send + Sync {
    async fn publisher(&self, bindings: Vec<BindingConfig>) -> Arc<dyn MessagePublisher>;
    async fn subscriber(
        &self,
        bindings: Vec<BindingConfig>,
        queue: QueueConfig,
    ) -> Result<Arc<dyn MessageSubscriber>, BrokerError>;
}

/// The real fabric: every publisher/subscriber it hands out shares the
/// one `RobustConnection` for the process lifetime.
pub struct BrokerFabric {
    conn: Arc<RobustConnection>,
}

impl BrokerFabric {
    pub fn new(conn: Arc<RobustConnection>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl MessagingFabric for BrokerFabric {
    async fn publisher(&self, bindings: Vec<BindingConfig>) -> Arc<dyn MessagePublisher> {
        Arc::new(Publisher::new(Arc::clone(&self.conn), bindings))
    }

    async fn subscriber(
        &self,
        bindings: Vec<BindingConfig>,
        queue: QueueConfig,
    ) -> Result<Arc<dyn MessageSubscriber>, BrokerError> {
        let subscriber = Arc::new(Subscriber::new(Arc::clone(&self.conn), bindings, queue));
        subscriber.initialize_channel().await?;
        tokio::spawn(watch_for_recovery(Arc::clone(&self.conn), Arc::clone(&subscriber)));
        Ok(subscriber)
    }
}

/// Registers with the `RobustConnection`'s state broadcast so this
/// subscriber re-declares its queue and restarts its consumer the
/// moment a reconnect completes, rather than silently stalling. Exits
/// once the `state()` sender is dropped, which happens when the
/// connection itself is gone.
async fn watch_for_recovery(conn: Arc<RobustConnection>, subscriber: Arc<Subscriber>) {
    let mut state = conn.state();
    while state.changed().await.is_ok() {
        if *state.borrow() == ConnectionState::Connected {
            if let Err(err) = subscriber.trigger_channel_recovery().await {
                warn!(error = %err, "failed to recover subscriber after reconnect");
            }
        }
    }
}
