//! An in-memory stand-in for the broker, used by higher-level crates'
//! tests so a Server/Worker/Status Processor run loop can be exercised
//! without a live RabbitMQ.

use std::sync::Arc;

use async_trait::async_trait;
use fleet_wire::{BindingConfig, QueueConfig};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::BrokerError;
use crate::fabric::MessagingFabric;
use crate::interface::{MessagePublisher, MessageSubscriber};

#[derive(Clone, Default)]
pub struct FakeBroker {
    inner: Arc<Mutex<Vec<(String, String, Vec<u8>)>>>,
    subscribers: Arc<Mutex<Vec<(Vec<(String, String)>, mpsc::UnboundedSender<Vec<u8>>)>>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publisher(&self, bindings: Vec<BindingConfig>) -> FakePublisher {
        let routes = bindings
            .iter()
            .flat_map(|binding| {
                binding
                    .routing_keys
                    .iter()
                    .map(|key| (binding.exchange.name().to_string(), key.build()))
            })
            .collect();
        FakePublisher {
            broker: self.clone(),
            routes,
        }
    }

    pub fn subscriber(&self, bindings: Vec<BindingConfig>) -> FakeSubscriber {
        let routes: Vec<(String, String)> = bindings
            .iter()
            .flat_map(|binding| {
                binding
                    .routing_keys
                    .iter()
                    .map(|key| (binding.exchange.name().to_string(), key.build()))
            })
            .collect();
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push((routes, tx));
        FakeSubscriber {
            receiver: Mutex::new(rx),
        }
    }

    fn dispatch(&self, exchange: &str, routing_key: &str, body: &[u8]) {
        self.inner
            .lock()
            .push((exchange.to_string(), routing_key.to_string(), body.to_vec()));
        for (routes, sender) in self.subscribers.lock().iter() {
            if routes
                .iter()
                .any(|(ex, pattern)| ex == exchange && matches_topic(pattern, routing_key))
            {
                let _ = sender.send(body.to_vec());
            }
        }
    }
}

#[async_trait]
impl MessagingFabric for FakeBroker {
    async fn publisher(&self, bindings: Vec<BindingConfig>) -> Arc<dyn MessagePublisher> {
        Arc::new(self.publisher(bindings))
    }

    async fn subscriber(
        &self,
        bindings: Vec<BindingConfig>,
        _queue: QueueConfig,
    ) -> Result<Arc<dyn MessageSubscriber>, BrokerError> {
        Ok(Arc::new(self.subscriber(bindings)))
    }
}

/// AMQP topic-exchange matching: `*` matches exactly one segment, `#`
/// matches zero or more segments.
fn matches_topic(pattern: &str, routing_key: &str) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('.').collect();
    let key_segments: Vec<&str> = routing_key.split('.').collect();
    matches_segments(&pattern_segments, &key_segments)
}

fn matches_segments(pattern: &[&str], key: &[&str]) -> bool {
    match (pattern.first(), key.first()) {
        (None, None) => true,
        (None, Some(_)) => false,
        (Some(&"#"), _) => {
            if pattern.len() == 1 {
                return true;
            }
            (0..=key.len()).any(|split| matches_segments(&pattern[1..], &key[split..]))
        }
        (Some(&"*"), Some(_)) => matches_segments(&pattern[1..], &key[1..]),
        (Some(p), Some(k)) if p == k => matches_segments(&pattern[1..], &key[1..]),
        _ => false,
    }
}

pub struct FakePublisher {
    broker: FakeBroker,
    routes: Vec<(String, String)>,
}

#[async_trait]
impl MessagePublisher for FakePublisher {
    async fn publish(&self, body: &[u8]) -> Result<(), BrokerError> {
        for (exchange, routing_key) in &self.routes {
            self.broker.dispatch(exchange, routing_key, body);
        }
        Ok(())
    }

    async fn shutdown(&self) {}
}

pub struct FakeSubscriber {
    receiver: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[async_trait]
impl MessageSubscriber for FakeSubscriber {
    async fn consume(&self) -> Vec<Vec<u8>> {
        let mut receiver = self.receiver.lock();
        let mut messages = Vec::new();
        while let Ok(body) = receiver.try_recv() {
            messages.push(body);
        }
        messages
    }

    async fn shutdown(&self) {}
}
