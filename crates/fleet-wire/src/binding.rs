use crate::routing_key::RoutingKey;

/// The two topic exchanges the fleet publishes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exchange {
    InternalServiceEvent,
    ExternalServiceEvent,
}

impl Exchange {
    pub fn name(self) -> &'static str {
        match self {
            Exchange::InternalServiceEvent => "internal_service_events",
            Exchange::ExternalServiceEvent => "external_service_events",
        }
    }
}

/// A queue's declaration parameters. `actual_name` is filled in once the
/// broker has assigned a server-generated name (for exclusive/anonymous
/// queues, `name` is empty and the broker picks one).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub name: String,
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
    pub actual_name: Option<String>,
}

impl QueueConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            exclusive: false,
            auto_delete: true,
            actual_name: None,
        }
    }

    pub fn anonymous_exclusive() -> Self {
        Self {
            name: String::new(),
            durable: false,
            exclusive: true,
            auto_delete: true,
            actual_name: None,
        }
    }

    pub fn declared_name(&self) -> &str {
        self.actual_name.as_deref().unwrap_or(&self.name)
    }
}

/// Binds one or more routing keys on one exchange.
#[derive(Debug, Clone)]
pub struct BindingConfig {
    pub exchange: Exchange,
    pub routing_keys: Vec<RoutingKey>,
}

impl BindingConfig {
    pub fn new(exchange: Exchange, routing_keys: Vec<RoutingKey>) -> Self {
        Self {
            exchange,
            routing_keys,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn declared_name_falls_back_to_requested_name() {
        let queue = QueueConfig::named("dev-queue-name-WORKER-42");
        assert_eq!(queue.declared_name(), "dev-queue-name-WORKER-42");
    }

    #[test]
    fn declared_name_prefers_broker_assigned_name() {
        let mut queue = QueueConfig::anonymous_exclusive();
        queue.actual_name = Some("amq.gen-abc123".to_string());
        assert_eq!(queue.declared_name(), "amq.gen-abc123");
    }
}
