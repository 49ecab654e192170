//! An in-memory stand-in for the Postgres-backed store, used by
//! `StatusProcessor`'s own tests and any other crate exercising it
//! without a live database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fleet_core::{StatusType, WorkerId};
use parking_lot::Mutex;

use crate::entities::ExternalStatusInfo;
use crate::error::StatusError;
use crate::repository::StatusRepository;

#[derive(Clone, Copy)]
struct WorkerRow {
    last_heartbeat: DateTime<Utc>,
    ended: bool,
}

#[derive(Default)]
pub struct FakeStatusRepository {
    statuses: Mutex<Vec<ExternalStatusInfo>>,
    workers: Mutex<HashMap<i64, WorkerRow>>,
}

impl FakeStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirrors a `worker_heartbeat` DAL call landing in the same table
    /// this repository's candidate query reads — the fake's stand-in
    /// for "the DAL and the Status Processor share one database."
    pub fn set_worker_heartbeat(&self, worker_id: WorkerId, last_heartbeat: DateTime<Utc>) {
        let mut workers = self.workers.lock();
        let row = workers.entry(worker_id.get()).or_insert(WorkerRow {
            last_heartbeat,
            ended: false,
        });
        row.last_heartbeat = last_heartbeat;
    }

    pub fn close_worker(&self, worker_id: WorkerId) {
        if let Some(row) = self.workers.lock().get_mut(&worker_id.get()) {
            row.ended = true;
        }
    }

    pub fn statuses(&self) -> Vec<ExternalStatusInfo> {
        self.statuses.lock().clone()
    }

    pub fn statuses_for_worker(&self, worker_id: WorkerId) -> Vec<ExternalStatusInfo> {
        self.statuses
            .lock()
            .iter()
            .filter(|s| s.worker_id == Some(worker_id))
            .cloned()
            .collect()
    }

    fn latest_worker_status(&self, worker_id: i64) -> Option<StatusType> {
        self.statuses
            .lock()
            .iter()
            .filter(|s| s.worker_id.map(WorkerId::get) == Some(worker_id))
            .max_by_key(|s| s.as_of)
            .map(|s| s.status_type)
    }
}

#[async_trait]
impl StatusRepository for FakeStatusRepository {
    async fn write_status(&self, status: ExternalStatusInfo) -> Result<(), StatusError> {
        self.statuses.lock().push(status);
        Ok(())
    }

    async fn candidate_lost_workers(
        &self,
        now: DateTime<Utc>,
        heartbeat_threshold: chrono::Duration,
        lookback_window: chrono::Duration,
    ) -> Result<Vec<WorkerId>, StatusError> {
        let threshold = now - heartbeat_threshold;
        let lookback = now - lookback_window;

        let candidates = self
            .workers
            .lock()
            .iter()
            .filter(|(_, row)| !row.ended)
            .filter(|(_, row)| row.last_heartbeat < threshold && row.last_heartbeat > lookback)
            .filter_map(|(&worker_id, _)| {
                let latest = self.latest_worker_status(worker_id)?;
                latest.is_active().then_some(WorkerId::new(worker_id))
            })
            .collect();
        Ok(candidates)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use fleet_core::EntityType;

    #[tokio::test]
    async fn a_worker_with_a_stale_heartbeat_and_running_status_is_a_candidate() {
        let repo = FakeStatusRepository::new();
        let now = Utc::now();
        let worker = WorkerId::new(1);
        repo.set_worker_heartbeat(worker, now - ChronoDuration::seconds(10));
        repo.write_status(ExternalStatusInfo::for_worker(worker, EntityType::Worker.as_str(), StatusType::Running, now))
            .await
            .unwrap();

        let candidates = repo
            .candidate_lost_workers(now, ChronoDuration::seconds(5), ChronoDuration::hours(1))
            .await
            .unwrap();

        assert_eq!(candidates, vec![worker]);
    }

    #[tokio::test]
    async fn a_worker_already_marked_lost_is_not_a_repeat_candidate() {
        let repo = FakeStatusRepository::new();
        let now = Utc::now();
        let worker = WorkerId::new(1);
        repo.set_worker_heartbeat(worker, now - ChronoDuration::seconds(10));
        repo.write_status(ExternalStatusInfo::for_worker(worker, EntityType::Worker.as_str(), StatusType::Running, now))
            .await
            .unwrap();
        repo.write_status(ExternalStatusInfo::for_worker(
            worker,
            "StatusEventProcessor",
            StatusType::Lost,
            now,
        ))
        .await
        .unwrap();

        let candidates = repo
            .candidate_lost_workers(now, ChronoDuration::seconds(5), ChronoDuration::hours(1))
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn a_closed_worker_is_never_a_candidate() {
        let repo = FakeStatusRepository::new();
        let now = Utc::now();
        let worker = WorkerId::new(1);
        repo.set_worker_heartbeat(worker, now - ChronoDuration::seconds(10));
        repo.close_worker(worker);
        repo.write_status(ExternalStatusInfo::for_worker(worker, EntityType::Worker.as_str(), StatusType::Running, now))
            .await
            .unwrap();

        let candidates = repo
            .candidate_lost_workers(now, ChronoDuration::seconds(5), ChronoDuration::hours(1))
            .await
            .unwrap();

        assert!(candidates.is_empty());
    }
}
