//! The concrete binding/queue conventions each component uses, factored
//! out so `fleet-worker`, `fleet-server`, and `fleet-status` all build
//! the same shapes instead of each hand-rolling its own routing keys.

use fleet_core::EntityType;

use crate::binding::{BindingConfig, Exchange, QueueConfig};
use crate::routing_key::RoutingKey;

/// `worker.<id>.status` / `game_server_instance.<id>.status` — where a
/// subject publishes its own lifecycle.
pub fn status_publish_binding(entity: EntityType, identifier: impl Into<String>) -> BindingConfig {
    BindingConfig::new(
        Exchange::InternalServiceEvent,
        vec![RoutingKey::status(entity, identifier)],
    )
}

/// `worker.<id>.command` / `game_server_instance.<id>.command` bound to
/// a durable, non-exclusive queue named `dev-queue-<entity>-<id>`.
pub fn command_subscribe(entity: EntityType, identifier: impl std::fmt::Display) -> (BindingConfig, QueueConfig) {
    let queue = QueueConfig::named(format!("dev-queue-{}-{identifier}", entity.as_str()));
    let binding = BindingConfig::new(
        Exchange::InternalServiceEvent,
        vec![RoutingKey::command(entity, identifier.to_string())],
    );
    (binding, queue)
}

/// The Status Processor's `*.*.status` subscription on
/// `internal_service_events`.
pub fn all_status_binding() -> BindingConfig {
    BindingConfig::new(
        Exchange::InternalServiceEvent,
        vec![
            RoutingKey::all_status_for(EntityType::Worker),
            RoutingKey::all_status_for(EntityType::GameServerInstance),
        ],
    )
}

pub fn status_processor_queue() -> QueueConfig {
    QueueConfig::named("dev-queue-status-processor")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn command_subscribe_names_the_queue_per_entity_and_id() {
        let (_, queue) = command_subscribe(EntityType::Worker, "42".to_string());
        assert_eq!(queue.name, "dev-queue-worker-42");
    }

    #[test]
    fn status_publish_binding_builds_the_expected_routing_key() {
        let binding = status_publish_binding(EntityType::GameServerInstance, "7".to_string());
        assert_eq!(binding.routing_keys[0].build(), "game_server_instance.7.status");
    }
}
