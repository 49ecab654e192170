use std::fmt;
use std::str::FromStr;

use fleet_core::EntityType;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Status,
    Command,
}

impl MessageType {
    fn as_str(self) -> &'static str {
        match self {
            MessageType::Status => "status",
            MessageType::Command => "command",
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "status" => Some(MessageType::Status),
            "command" => Some(MessageType::Command),
            _ => None,
        }
    }
}

fn entity_as_str(entity: EntityType) -> &'static str {
    entity.as_str()
}

fn entity_parse(segment: &str) -> Option<EntityType> {
    match segment {
        "worker" => Some(EntityType::Worker),
        "game_server_instance" => Some(EntityType::GameServerInstance),
        _ => None,
    }
}

/// A routing-key segment that may be a concrete value, a single-segment
/// wildcard (`*`), or a multi-segment wildcard (`#`).
///
/// Replaces the closed-enum-plus-separate-wildcard-set shape of the
/// original registry types with one tagged type whose `build`/`parse`
/// are total functions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingKeyComponent<T> {
    Concrete(T),
    Any,
    AnyMulti,
}

impl<T> RoutingKeyComponent<T> {
    pub fn concrete(value: T) -> Self {
        RoutingKeyComponent::Concrete(value)
    }

    fn wildcard_str(&self) -> Option<&'static str> {
        match self {
            RoutingKeyComponent::Any => Some("*"),
            RoutingKeyComponent::AnyMulti => Some("#"),
            RoutingKeyComponent::Concrete(_) => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingKeyError {
    #[error("routing key must have at least entity.identifier.type, got {0:?}")]
    TooFewSegments(String),
    #[error("unknown entity segment: {0}")]
    UnknownEntity(String),
    #[error("unknown message type segment: {0}")]
    UnknownMessageType(String),
}

/// `entity.identifier.type[.subtype]`, e.g. `worker.42.status` or
/// `game_server_instance.*.command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingKey {
    pub entity: RoutingKeyComponent<EntityType>,
    pub identifier: RoutingKeyComponent<String>,
    pub message_type: RoutingKeyComponent<MessageType>,
    pub subtype: Option<RoutingKeyComponent<String>>,
}

impl RoutingKey {
    pub fn status(entity: EntityType, identifier: impl Into<String>) -> Self {
        Self {
            entity: RoutingKeyComponent::Concrete(entity),
            identifier: RoutingKeyComponent::Concrete(identifier.into()),
            message_type: RoutingKeyComponent::Concrete(MessageType::Status),
            subtype: None,
        }
    }

    pub fn command(entity: EntityType, identifier: impl Into<String>) -> Self {
        Self {
            entity: RoutingKeyComponent::Concrete(entity),
            identifier: RoutingKeyComponent::Concrete(identifier.into()),
            message_type: RoutingKeyComponent::Concrete(MessageType::Command),
            subtype: None,
        }
    }

    /// Subscribes to every status message for every instance of `entity`.
    pub fn all_status_for(entity: EntityType) -> Self {
        Self {
            entity: RoutingKeyComponent::Concrete(entity),
            identifier: RoutingKeyComponent::Any,
            message_type: RoutingKeyComponent::Concrete(MessageType::Status),
            subtype: None,
        }
    }

    pub fn build(&self) -> String {
        let entity = match &self.entity {
            RoutingKeyComponent::Concrete(e) => entity_as_str(*e),
            other => other.wildcard_str().unwrap_or("*"),
        };
        let identifier = match &self.identifier {
            RoutingKeyComponent::Concrete(s) => s.as_str(),
            other => other.wildcard_str().unwrap_or("*"),
        };
        let message_type = match &self.message_type {
            RoutingKeyComponent::Concrete(t) => t.as_str(),
            other => other.wildcard_str().unwrap_or("*"),
        };
        let mut key = format!("{entity}.{identifier}.{message_type}");
        if let Some(subtype) = &self.subtype {
            let subtype_str = match subtype {
                RoutingKeyComponent::Concrete(s) => s.as_str(),
                other => other.wildcard_str().unwrap_or("*"),
            };
            key.push('.');
            key.push_str(subtype_str);
        }
        key
    }

    pub fn parse(raw: &str) -> Result<Self, RoutingKeyError> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() < 3 {
            return Err(RoutingKeyError::TooFewSegments(raw.to_string()));
        }

        let entity = match segments[0] {
            "*" => RoutingKeyComponent::Any,
            "#" => RoutingKeyComponent::AnyMulti,
            other => entity_parse(other)
                .map(RoutingKeyComponent::Concrete)
                .ok_or_else(|| RoutingKeyError::UnknownEntity(other.to_string()))?,
        };

        let identifier = match segments[1] {
            "*" => RoutingKeyComponent::Any,
            "#" => RoutingKeyComponent::AnyMulti,
            other => RoutingKeyComponent::Concrete(other.to_string()),
        };

        let message_type = match segments[2] {
            "*" => RoutingKeyComponent::Any,
            "#" => RoutingKeyComponent::AnyMulti,
            other => MessageType::parse(other)
                .map(RoutingKeyComponent::Concrete)
                .ok_or_else(|| RoutingKeyError::UnknownMessageType(other.to_string()))?,
        };

        let subtype = segments.get(3).map(|segment| match *segment {
            "*" => RoutingKeyComponent::Any,
            "#" => RoutingKeyComponent::AnyMulti,
            other => RoutingKeyComponent::Concrete(other.to_string()),
        });

        Ok(Self {
            entity,
            identifier,
            message_type,
            subtype,
        })
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build())
    }
}

impl FromStr for RoutingKey {
    type Err = RoutingKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_concrete_status_key() {
        let key = RoutingKey::status(EntityType::Worker, "42");
        assert_eq!(key.build(), "worker.42.status");
    }

    #[test]
    fn builds_a_wildcard_identifier_key() {
        let key = RoutingKey::all_status_for(EntityType::GameServerInstance);
        assert_eq!(key.build(), "game_server_instance.*.status");
    }

    #[test]
    fn round_trips_through_build_and_parse() {
        let key = RoutingKey::command(EntityType::Worker, "7");
        let rebuilt = RoutingKey::parse(&key.build()).unwrap();
        assert_eq!(key, rebuilt);
    }

    #[test]
    fn round_trips_a_wildcard_key() {
        let key = RoutingKey::all_status_for(EntityType::Worker);
        let rebuilt = RoutingKey::parse(&key.build()).unwrap();
        assert_eq!(key, rebuilt);
    }

    #[test]
    fn rejects_too_few_segments() {
        assert_eq!(
            RoutingKey::parse("worker.42"),
            Err(RoutingKeyError::TooFewSegments("worker.42".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_entity() {
        assert_eq!(
            RoutingKey::parse("spaceship.1.status"),
            Err(RoutingKeyError::UnknownEntity("spaceship".to_string()))
        );
    }

    proptest::proptest! {
        #[test]
        fn arbitrary_concrete_keys_round_trip(identifier in "[a-zA-Z0-9_-]{1,12}") {
            let key = RoutingKey::status(EntityType::Worker, identifier);
            let rebuilt = RoutingKey::parse(&key.build()).unwrap();
            proptest::prop_assert_eq!(key, rebuilt);
        }
    }
}
