use serde::{Deserialize, Serialize};

/// The entity kinds that publish or are described by status/command traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Worker,
    GameServerInstance,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Worker => "worker",
            EntityType::GameServerInstance => "game_server_instance",
        }
    }
}

/// Lifecycle status of a Worker or Server, as published on its status topic.
///
/// `ACTIVE` types are the ones a subject may publish about itself.
/// `OBSERVED_ONLY` types may only be published by an external observer
/// (the Status Processor), never by the subject describing its own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Created,
    Initializing,
    Running,
    Complete,
    Lost,
    Crashed,
}

impl StatusType {
    pub const ACTIVE: [StatusType; 3] = [
        StatusType::Created,
        StatusType::Initializing,
        StatusType::Running,
    ];

    pub const OBSERVED_ONLY: [StatusType; 2] = [StatusType::Lost, StatusType::Crashed];

    /// True if a subject is allowed to publish this status about itself.
    pub fn is_self_reportable(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }
}
