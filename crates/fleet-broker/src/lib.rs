//! A robust AMQP 0.9.1 connection wrapper (reconnect with backoff, TLS,
//! idle-stale detection) plus topic-exchange publisher/subscriber types
//! built on top of it.

pub mod config;
pub mod connection;
pub mod error;
pub mod fabric;
pub mod interface;
pub mod publisher;
pub mod subscriber;

pub use config::{BrokerConfig, TlsConfig};
pub use connection::{ConnectionState, RobustConnection};
pub use error::BrokerError;
pub use fabric::{BrokerFabric, MessagingFabric};
pub use interface::{MessagePublisher, MessageSubscriber};
pub use publisher::Publisher;
pub use subscriber::Subscriber;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBroker, FakePublisher, FakeSubscriber};
