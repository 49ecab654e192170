use chrono::{DateTime, Utc};
use fleet_core::{Command, EntityType, StatusType};
use serde::{Deserialize, Serialize};

/// The body published on a status routing key.
///
/// `identifier` is the stringified id of the `entity_type` (a `WorkerId`
/// or `GameServerInstanceId`) — kept as a plain string here since the
/// messaging fabric has no business parsing it back into a typed id;
/// only the Status Processor's repository layer does that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub entity_type: EntityType,
    pub identifier: String,
    pub status_type: StatusType,
    pub as_of: DateTime<Utc>,
    /// Name of the component that observed/published this status, e.g.
    /// `"WorkerService"` or `"StatusEventProcessor"` for an out-of-band
    /// observation like LOST.
    pub class_name: String,
}

impl StatusMessage {
    pub fn new(entity_type: EntityType, identifier: impl Into<String>, status_type: StatusType) -> Self {
        Self {
            entity_type,
            identifier: identifier.into(),
            status_type,
            as_of: Utc::now(),
            class_name: entity_type.as_str().to_string(),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// The body published on a command routing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(flatten)]
    pub command: Command,
}

impl CommandMessage {
    pub fn new(command: Command) -> Self {
        Self { command }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn status_message_round_trips_through_json() {
        let message = StatusMessage::new(EntityType::Worker, "9", StatusType::Running);
        let bytes = message.to_bytes().unwrap();
        let decoded = StatusMessage::from_bytes(&bytes).unwrap();
        assert_eq!(message, decoded);
    }

    #[test]
    fn command_message_round_trips_through_json() {
        let message = CommandMessage::new(Command::start("3"));
        let bytes = message.to_bytes().unwrap();
        let decoded = CommandMessage::from_bytes(&bytes).unwrap();
        assert_eq!(message, decoded);
    }
}
