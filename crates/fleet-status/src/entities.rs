use chrono::{DateTime, Utc};
use fleet_core::{GameServerInstanceId, StatusType, WorkerId};

/// One persisted status event. Exactly one of `worker_id` /
/// `game_server_instance_id` is set, mirroring the table's CHECK
/// constraint — this crate is the one writer of this table, so the
/// invariant is upheld by construction (`for_worker` / `for_instance`)
/// rather than re-validated on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalStatusInfo {
    pub worker_id: Option<WorkerId>,
    pub game_server_instance_id: Option<GameServerInstanceId>,
    pub class_name: String,
    pub status_type: StatusType,
    pub as_of: DateTime<Utc>,
}

impl ExternalStatusInfo {
    pub fn for_worker(worker_id: WorkerId, class_name: impl Into<String>, status_type: StatusType, as_of: DateTime<Utc>) -> Self {
        Self {
            worker_id: Some(worker_id),
            game_server_instance_id: None,
            class_name: class_name.into(),
            status_type,
            as_of,
        }
    }

    pub fn for_instance(
        instance_id: GameServerInstanceId,
        class_name: impl Into<String>,
        status_type: StatusType,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            worker_id: None,
            game_server_instance_id: Some(instance_id),
            class_name: class_name.into(),
            status_type,
            as_of,
        }
    }
}

/// The class name the Status Processor stamps onto every status it
/// synthesizes itself, as opposed to one it merely relays from a
/// subject's own `InternalStatusInfo`.
pub const STATUS_EVENT_PROCESSOR_CLASS: &str = "StatusEventProcessor";
