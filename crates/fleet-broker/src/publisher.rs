use std::sync::Arc;

use fleet_wire::BindingConfig;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, ExchangeKind};
use tokio::sync::Mutex;

use crate::connection::RobustConnection;
use crate::error::BrokerError;

/// Publishes a message body to every `(exchange, routing_key)` pair
/// named by its bindings. One channel per publisher, opened lazily and
/// reopened transparently after a reconnect.
pub struct Publisher {
    conn: Arc<RobustConnection>,
    bindings: Vec<BindingConfig>,
    channel: Mutex<Option<lapin::Channel>>,
}

impl Publisher {
    pub fn new(conn: Arc<RobustConnection>, bindings: Vec<BindingConfig>) -> Self {
        Self {
            conn,
            bindings,
            channel: Mutex::new(None),
        }
    }

    pub async fn publish(&self, body: &[u8]) -> Result<(), BrokerError> {
        let channel = self.ensure_channel().await?;
        for binding in &self.bindings {
            for routing_key in &binding.routing_keys {
                let confirm = channel
                    .basic_publish(
                        binding.exchange.name(),
                        &routing_key.build(),
                        BasicPublishOptions::default(),
                        body,
                        BasicProperties::default(),
                    )
                    .await
                    .map_err(BrokerError::Channel)?;
                confirm.await.map_err(BrokerError::Channel)?;
            }
        }
        Ok(())
    }

    async fn ensure_channel(&self) -> Result<lapin::Channel, BrokerError> {
        let mut guard = self.channel.lock().await;
        if let Some(channel) = guard.as_ref() {
            if channel.status().connected() {
                return Ok(channel.clone());
            }
        }
        let channel = self.conn.channel().await?;
        for binding in &self.bindings {
            channel
                .exchange_declare(
                    binding.exchange.name(),
                    ExchangeKind::Topic,
                    ExchangeDeclareOptions {
                        durable: true,
                        ..ExchangeDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(BrokerError::Channel)?;
        }
        *guard = Some(channel.clone());
        Ok(channel)
    }

    pub async fn shutdown(&self) {
        if let Some(channel) = self.channel.lock().await.take() {
            let _ = channel.close(0, "publisher shutdown").await;
        }
    }
}
