use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fleet_wire::{BindingConfig, QueueConfig};
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::ExchangeKind;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::connection::RobustConnection;
use crate::error::BrokerError;

/// Consumes from one queue bound to one or more routing keys. Messages
/// are acked the moment they are received (at-most-once: a crash between
/// ack and `consume()` draining the buffer loses the message) and pushed
/// into an internal buffer that `consume()` drains non-blockingly.
pub struct Subscriber {
    conn: Arc<RobustConnection>,
    bindings: Vec<BindingConfig>,
    queue_config: Mutex<QueueConfig>,
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    consumer_task: Mutex<Option<JoinHandle<()>>>,
    channel: Mutex<Option<lapin::Channel>>,
    should_stop: Arc<AtomicBool>,
}

impl Subscriber {
    pub fn new(conn: Arc<RobustConnection>, bindings: Vec<BindingConfig>, queue_config: QueueConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            conn,
            bindings,
            queue_config: Mutex::new(queue_config),
            sender,
            receiver: Mutex::new(receiver),
            consumer_task: Mutex::new(None),
            channel: Mutex::new(None),
            should_stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declares each binding's exchange (idempotent, same as
    /// `Publisher::ensure_channel`), declares the queue, binds every
    /// routing key, and starts a dedicated consumer task. Declaring the
    /// exchange here too means a host-side subscriber (Status Processor,
    /// Log Subscriber) can come up and start consuming before any
    /// worker has published and declared it. Safe to call again after a
    /// reconnect — the previous consumer task, if any, is stopped first.
    pub async fn initialize_channel(&self) -> Result<(), BrokerError> {
        if let Some(task) = self.consumer_task.lock().await.take() {
            task.abort();
        }

        let channel = self.conn.channel().await?;
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(BrokerError::Channel)?;

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

        let mut queue_config = self.queue_config.lock().await;
        let declared = channel
            .queue_declare(
                &queue_config.name,
                QueueDeclareOptions {
                    durable: queue_config.durable,
                    exclusive: queue_config.exclusive,
                    auto_delete: queue_config.auto_delete,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Channel)?;
        let actual_name = declared.name().to_string();
        queue_config.actual_name = Some(actual_name.clone());
        drop(queue_config);

        for binding in &self.bindings {
            for routing_key in &binding.routing_keys {
                channel
                    .queue_bind(
                        &actual_name,
                        binding.exchange.name(),
                        &routing_key.build(),
                        QueueBindOptions::default(),
                        FieldTable::default(),
                    )
                    .await
                    .map_err(BrokerError::Channel)?;
            }
        }

        let consumer_tag = format!("fleet-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                &actual_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::Channel)?;

        let sender = self.sender.clone();
        let should_stop = Arc::clone(&self.should_stop);
        let task = tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                if should_stop.load(Ordering::SeqCst) {
                    return;
                }
                match delivery {
                    Ok(delivery) => {
                        let body = delivery.data.clone();
                        if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
                            warn!(error = %err, "failed to ack delivery");
                        }
                        if sender.send(body).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "consumer stream error, stopping this consumer task");
                        return;
                    }
                }
            }
        });

        *self.channel.lock().await = Some(channel);
        *self.consumer_task.lock().await = Some(task);
        info!(queue = %actual_name, "subscriber consuming");
        Ok(())
    }

    /// Drains every message currently buffered, without blocking.
    pub async fn consume(&self) -> Vec<Vec<u8>> {
        let mut receiver = self.receiver.lock().await;
        let mut messages = Vec::new();
        while let Ok(body) = receiver.try_recv() {
            messages.push(body);
        }
        messages
    }

    /// Called by the owning connection after it observes a reconnect.
    pub async fn trigger_channel_recovery(&self) -> Result<(), BrokerError> {
        self.initialize_channel().await
    }

    pub async fn shutdown(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.consumer_task.lock().await.take() {
            task.abort();
        }
        if let Some(channel) = self.channel.lock().await.take() {
            let _ = channel.close(0, "subscriber shutdown").await;
        }
    }
}
