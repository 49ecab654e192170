//! The Status Processor: consumes every internal status event, persists
//! it, and detects workers whose heartbeat has gone stale while their
//! last known status is still `ACTIVE`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_broker::{MessageSubscriber, MessagingFabric};
use fleet_core::{EntityType, GameServerInstanceId, StatusType, WorkerId};
use fleet_wire::{topology, StatusMessage};
use tracing::{info, warn};

use crate::config::StatusConfig;
use crate::entities::{ExternalStatusInfo, STATUS_EVENT_PROCESSOR_CLASS};
use crate::error::StatusError;
use crate::repository::StatusRepository;

const LIVENESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

pub struct StatusProcessor {
    repo: Arc<dyn StatusRepository>,
    subscriber: Arc<dyn MessageSubscriber>,
    fabric: Arc<dyn MessagingFabric>,
    tick_interval: Duration,
    heartbeat_threshold: chrono::Duration,
    lookback_window: chrono::Duration,
    stopped: AtomicBool,
}

impl StatusProcessor {
    pub async fn create(
        config: &StatusConfig,
        repo: Arc<dyn StatusRepository>,
        fabric: Arc<dyn MessagingFabric>,
    ) -> Result<Self, StatusError> {
        let subscriber = fabric
            .subscriber(vec![topology::all_status_binding()], topology::status_processor_queue())
            .await?;
        Ok(Self {
            repo,
            subscriber,
            fabric,
            tick_interval: config.tick_interval,
            heartbeat_threshold: chrono::Duration::from_std(config.heartbeat_threshold)
                .unwrap_or(chrono::Duration::seconds(5)),
            lookback_window: chrono::Duration::from_std(config.lookback_window).unwrap_or(chrono::Duration::hours(1)),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub async fn run(&self) {
        let mut last_liveness_log = tokio::time::Instant::now();
        while !self.stopped.load(Ordering::SeqCst) {
            let tick_start = tokio::time::Instant::now();

            if tick_start.duration_since(last_liveness_log) >= LIVENESS_LOG_INTERVAL {
                info!("status processor still running");
                last_liveness_log = tick_start;
            }

            self.consume_and_persist().await;
            self.check_heartbeats().await;

            let elapsed = tick_start.elapsed();
            if elapsed < self.tick_interval {
                tokio::time::sleep(self.tick_interval - elapsed).await;
            }
        }
        self.subscriber.shutdown().await;
    }

    /// Drains every buffered `InternalStatusInfo`, converts it to an
    /// `ExternalStatusInfo` by parsing `identifier` as the integer id of
    /// `entity_type`, and persists it. A write failure is logged and
    /// swallowed — the broker has already acked the message.
    pub async fn consume_and_persist(&self) {
        for body in self.subscriber.consume().await {
            let message = match StatusMessage::from_bytes(&body) {
                Ok(message) => message,
                Err(err) => {
                    warn!(error = %err, "dropping malformed status message");
                    continue;
                }
            };

            let Some(status) = to_external_status(&message) else {
                warn!(identifier = %message.identifier, entity_type = ?message.entity_type, "status message identifier is not a valid integer id, dropping");
                continue;
            };

            if let Err(err) = self.repo.write_status(status).await {
                warn!(error = %err, "failed to write status to the store");
            }
        }
    }

    /// One heartbeat-timeout tick: find candidates, write a synthetic
    /// `LOST` row for each, and publish a `LOST` `InternalStatusInfo` on
    /// that worker's own status topic so active subscribers (e.g. the
    /// worker's own cascade logic, dashboards) observe the transition.
    pub async fn check_heartbeats(&self) {
        let now = Utc::now();
        let candidates = match self
            .repo
            .candidate_lost_workers(now, self.heartbeat_threshold, self.lookback_window)
            .await
        {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "failed to query candidate lost workers");
                return;
            }
        };

        for worker_id in candidates {
            warn!(%worker_id, "worker heartbeat is stale, marking as LOST");
            let synthetic = ExternalStatusInfo::for_worker(worker_id, STATUS_EVENT_PROCESSOR_CLASS, StatusType::Lost, now);
            if let Err(err) = self.repo.write_status(synthetic).await {
                warn!(error = %err, %worker_id, "failed to write synthetic LOST status");
            }
            self.publish_lost(worker_id, now).await;
        }
    }

    async fn publish_lost(&self, worker_id: WorkerId, as_of: chrono::DateTime<Utc>) {
        let publisher = self
            .fabric
            .publisher(vec![topology::status_publish_binding(EntityType::Worker, worker_id.to_string())])
            .await;
        let mut message = StatusMessage::new(EntityType::Worker, worker_id.to_string(), StatusType::Lost);
        message.as_of = as_of;
        message.class_name = STATUS_EVENT_PROCESSOR_CLASS.to_string();
        match message.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = publisher.publish(&bytes).await {
                    warn!(error = %err, %worker_id, "failed to publish synthetic LOST status");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize synthetic LOST status message"),
        }
        publisher.shutdown().await;
    }
}

fn to_external_status(message: &StatusMessage) -> Option<ExternalStatusInfo> {
    let id: i64 = message.identifier.parse().ok()?;
    Some(match message.entity_type {
        EntityType::Worker => ExternalStatusInfo::for_worker(WorkerId::new(id), &message.class_name, message.status_type, message.as_of),
        EntityType::GameServerInstance => ExternalStatusInfo::for_instance(
            GameServerInstanceId::new(id),
            &message.class_name,
            message.status_type,
            message.as_of,
        ),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fleet_broker::FakeBroker;
    use fleet_wire::{topology, CommandMessage};

    use crate::fake::FakeStatusRepository;

    async fn processor(repo: Arc<FakeStatusRepository>, broker: &FakeBroker) -> StatusProcessor {
        let fabric: Arc<dyn MessagingFabric> = Arc::new(broker.clone());
        StatusProcessor::create(&StatusConfig::new("unused"), repo, fabric).await.unwrap()
    }

    #[tokio::test]
    async fn consume_and_persist_converts_internal_status_to_external() {
        let repo = Arc::new(FakeStatusRepository::new());
        let broker = FakeBroker::new();
        let processor = processor(repo.clone(), &broker).await;

        let publisher = broker.publisher(vec![topology::status_publish_binding(EntityType::Worker, "5")]);
        let message = StatusMessage::new(EntityType::Worker, "5", StatusType::Running);
        publisher.publish(&message.to_bytes().unwrap()).await.unwrap();

        processor.consume_and_persist().await;

        let statuses = repo.statuses_for_worker(WorkerId::new(5));
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status_type, StatusType::Running);
    }

    #[tokio::test]
    async fn malformed_status_body_is_dropped_not_persisted() {
        let repo = Arc::new(FakeStatusRepository::new());
        let broker = FakeBroker::new();
        let processor = processor(repo.clone(), &broker).await;

        let publisher = broker.publisher(vec![topology::status_publish_binding(EntityType::Worker, "5")]);
        publisher
            .publish(&CommandMessage::new(fleet_core::Command::stop_all()).to_bytes().unwrap())
            .await
            .unwrap();

        processor.consume_and_persist().await;

        assert!(repo.statuses().is_empty());
    }

    #[tokio::test]
    async fn check_heartbeats_writes_and_publishes_lost_for_a_stale_worker() {
        let repo = Arc::new(FakeStatusRepository::new());
        let broker = FakeBroker::new();
        let processor = processor(repo.clone(), &broker).await;

        let worker = WorkerId::new(9);
        let now = Utc::now();
        repo.set_worker_heartbeat(worker, now - chrono::Duration::seconds(30));
        repo.write_status(ExternalStatusInfo::for_worker(worker, "WorkerService", StatusType::Running, now))
            .await
            .unwrap();

        let subscriber = broker.subscriber(vec![topology::status_publish_binding(EntityType::Worker, "9")]);

        processor.check_heartbeats().await;

        let statuses = repo.statuses_for_worker(worker);
        assert!(statuses.iter().any(|s| s.status_type == StatusType::Lost));

        let delivered = subscriber.consume().await;
        assert_eq!(delivered.len(), 1);
        let delivered_message = StatusMessage::from_bytes(&delivered[0]).unwrap();
        assert_eq!(delivered_message.status_type, StatusType::Lost);
    }

    #[tokio::test]
    async fn check_heartbeats_does_not_fire_twice_for_the_same_stale_worker() {
        let repo = Arc::new(FakeStatusRepository::new());
        let broker = FakeBroker::new();
        let processor = processor(repo.clone(), &broker).await;

        let worker = WorkerId::new(9);
        let now = Utc::now();
        repo.set_worker_heartbeat(worker, now - chrono::Duration::seconds(30));
        repo.write_status(ExternalStatusInfo::for_worker(worker, "WorkerService", StatusType::Running, now))
            .await
            .unwrap();

        processor.check_heartbeats().await;
        processor.check_heartbeats().await;

        let lost_count = repo
            .statuses_for_worker(worker)
            .into_iter()
            .filter(|s| s.status_type == StatusType::Lost)
            .count();
        assert_eq!(lost_count, 1);
    }
}
