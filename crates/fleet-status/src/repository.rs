//! The Status Processor's store: everything it needs from the same
//! Postgres database the Worker DAL writes to (shared schema, no second
//! source of truth), realized as one `sqlx` query per operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_core::{GameServerInstanceId, StatusType, WorkerId};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::entities::ExternalStatusInfo;
use crate::error::StatusError;

/// What the Status Processor needs from the store, independent of
/// whether it's backed by a live Postgres pool or the in-memory
/// `FakeStatusRepository` used in tests.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    async fn write_status(&self, status: ExternalStatusInfo) -> Result<(), StatusError>;

    /// Workers whose `last_heartbeat` falls in `(now - lookback, now -
    /// heartbeat_threshold)`, are not yet `end_date`-closed, and whose
    /// latest status is one of the `ACTIVE` types. Workers whose latest
    /// status is already `LOST`/`CRASHED`/`COMPLETE` never come back,
    /// which is what keeps a single stale heartbeat from firing `LOST`
    /// twice.
    async fn candidate_lost_workers(
        &self,
        now: DateTime<Utc>,
        heartbeat_threshold: chrono::Duration,
        lookback_window: chrono::Duration,
    ) -> Result<Vec<WorkerId>, StatusError>;
}

/// SCREAMING_SNAKE_CASE, matching `StatusType`'s serde representation
/// (`fleet_core::status`) — kept as a local mapping rather than a
/// dependency from `fleet-core` on a DB string format, since only this
/// repository needs it.
fn status_type_db_str(status_type: StatusType) -> &'static str {
    match status_type {
        StatusType::Created => "CREATED",
        StatusType::Initializing => "INITIALIZING",
        StatusType::Running => "RUNNING",
        StatusType::Complete => "COMPLETE",
        StatusType::Lost => "LOST",
        StatusType::Crashed => "CRASHED",
    }
}

#[cfg(test)]
fn status_type_from_db_str(raw: &str) -> Option<StatusType> {
    match raw {
        "CREATED" => Some(StatusType::Created),
        "INITIALIZING" => Some(StatusType::Initializing),
        "RUNNING" => Some(StatusType::Running),
        "COMPLETE" => Some(StatusType::Complete),
        "LOST" => Some(StatusType::Lost),
        "CRASHED" => Some(StatusType::Crashed),
        _ => None,
    }
}

pub struct PgStatusRepository {
    pool: PgPool,
}

impl PgStatusRepository {
    pub async fn connect(database_url: &str) -> Result<Self, StatusError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(StatusError::Store)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusRepository for PgStatusRepository {
    async fn write_status(&self, status: ExternalStatusInfo) -> Result<(), StatusError> {
        sqlx::query(
            "INSERT INTO external_status_info \
             (worker_id, game_server_instance_id, class_name, status_type, as_of) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(status.worker_id.map(WorkerId::get))
        .bind(status.game_server_instance_id.map(GameServerInstanceId::get))
        .bind(&status.class_name)
        .bind(status_type_db_str(status.status_type))
        .bind(status.as_of)
        .execute(&self.pool)
        .await
        .map_err(StatusError::Store)?;
        Ok(())
    }

    async fn candidate_lost_workers(
        &self,
        now: DateTime<Utc>,
        heartbeat_threshold: chrono::Duration,
        lookback_window: chrono::Duration,
    ) -> Result<Vec<WorkerId>, StatusError> {
        let active: Vec<&'static str> = StatusType::ACTIVE.iter().copied().map(status_type_db_str).collect();
        let threshold = now - heartbeat_threshold;
        let lookback = now - lookback_window;

        let rows: Vec<(i64,)> = sqlx::query_as(
            "WITH latest AS ( \
                 SELECT DISTINCT ON (worker_id) worker_id, status_type \
                 FROM external_status_info \
                 WHERE worker_id IS NOT NULL \
                 ORDER BY worker_id, as_of DESC \
             ) \
             SELECT w.worker_id \
             FROM worker w \
             JOIN latest l ON l.worker_id = w.worker_id \
             WHERE w.end_date IS NULL \
               AND w.last_heartbeat < $1 \
               AND w.last_heartbeat > $2 \
               AND l.status_type = ANY($3)",
        )
        .bind(threshold)
        .bind(lookback)
        .bind(&active)
        .fetch_all(&self.pool)
        .await
        .map_err(StatusError::Store)?;

        Ok(rows.into_iter().map(|(id,)| WorkerId::new(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_str_round_trips_every_status_type() {
        for status in [
            StatusType::Created,
            StatusType::Initializing,
            StatusType::Running,
            StatusType::Complete,
            StatusType::Lost,
            StatusType::Crashed,
        ] {
            let raw = status_type_db_str(status);
            assert_eq!(status_type_from_db_str(raw), Some(status));
        }
    }
}
