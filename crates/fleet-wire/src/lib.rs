//! Wire-level shapes for the messaging fabric: the routing-key grammar,
//! exchange/queue/binding configuration, and the message bodies carried
//! on status and command topics.

pub mod binding;
pub mod message;
pub mod routing_key;
pub mod topology;

pub use binding::{BindingConfig, Exchange, QueueConfig};
pub use message::{CommandMessage, StatusMessage};
pub use routing_key::{MessageType, RoutingKey, RoutingKeyComponent};
pub use topology::{all_status_binding, command_subscribe, status_processor_queue, status_publish_binding};
