use chrono::{DateTime, Utc};
use fleet_core::{GameServerConfigId, GameServerId, GameServerInstanceId, StatusType, WorkerId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub worker_id: WorkerId,
    pub created_date: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    Steam,
}

impl ServerType {
    /// Lower-cased form used as the first path segment of an install
    /// directory: `<root>/<server_type>/<app_id>/<config.name>`.
    pub fn dir_name(self) -> &'static str {
        match self {
            ServerType::Steam => "steam",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServer {
    pub game_server_id: GameServerId,
    pub name: String,
    pub server_type: ServerType,
    pub app_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServerConfig {
    pub game_server_config_id: GameServerConfigId,
    pub game_server_id: GameServerId,
    pub name: String,
    pub is_default: bool,
    pub is_visible: bool,
    pub executable: String,
    pub args: Vec<String>,
    pub env_var: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServerInstance {
    pub game_server_instance_id: GameServerInstanceId,
    pub game_server_config_id: GameServerConfigId,
    pub worker_id: WorkerId,
    pub created_date: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl GameServerConfig {
    /// Parses `env_var`'s `K=V` strings into pairs, dropping any entry
    /// without an `=` (the DAL is expected never to persist one, but the
    /// wire shape doesn't make that a type-level guarantee).
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env_var
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

impl GameServerInstance {
    pub fn is_shutdown(&self) -> bool {
        self.end_date.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalStatusInfo {
    pub worker_id: Option<WorkerId>,
    pub game_server_instance_id: Option<GameServerInstanceId>,
    pub class_name: String,
    pub status_type: StatusType,
    pub as_of: DateTime<Utc>,
}
