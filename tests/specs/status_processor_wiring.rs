//! Scenario 4 (worker LOST detection), exercised across the crate
//! boundary a single crate's own tests can't see: a `WorkerLoop`'s own
//! `CREATED`/`RUNNING` publications, consumed and persisted by a
//! `StatusProcessor` over the very same broker, followed by the
//! processor detecting a stale heartbeat and publishing a synthetic
//! `LOST` back onto that worker's own status topic.

use std::sync::Arc;
use std::time::Duration;

use fleet_broker::{MessageSubscriber, MessagingFabric};
use fleet_core::WorkerId;
use fleet_status::{StatusConfig, StatusProcessor};
use fleet_wire::StatusMessage;
use fleet_worker::{WorkerConfig, WorkerLoop};

use crate::prelude::*;

#[tokio::test]
async fn a_workers_own_status_publications_are_picked_up_and_a_stale_heartbeat_goes_lost() {
    let dal = Arc::new(FakeDal::new());
    let broker = FakeBroker::new();
    let fabric: Arc<dyn MessagingFabric> = Arc::new(broker.clone());
    let root = tempfile::tempdir().unwrap();
    let mut worker_config = WorkerConfig::new(root.path());
    worker_config.should_update = false;

    // The processor's subscriber must exist before the worker publishes
    // anything: `FakeBroker` delivers live with no backlog, so a
    // subscriber registered after a publish never sees it.
    let repo = Arc::new(fleet_status::fake::FakeStatusRepository::new());
    let processor = StatusProcessor::create(&StatusConfig::new("unused"), repo.clone(), fabric.clone())
        .await
        .unwrap();

    let worker = WorkerLoop::create(
        &worker_config,
        dal.clone(),
        Arc::new(FakeInstaller::new()),
        Arc::new(FakeExternalProcess::new()),
        Arc::new(FakeClock::new()),
        fabric.clone(),
    )
    .await
    .unwrap();

    // Worker publishes CREATED on create(); RUNNING is published once run() starts.
    // Drive the processor's ingest directly rather than spinning its own run().
    processor.consume_and_persist().await;
    let worker_id = worker.worker_id();
    let persisted = repo.statuses_for_worker(worker_id);
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].status_type, StatusType::Created);

    // Simulate the worker's heartbeat going stale without it ever
    // reporting RUNNING->COMPLETE itself.
    repo.set_worker_heartbeat(worker_id, chrono::Utc::now() - chrono::Duration::seconds(30));

    let lost_subscriber = broker.subscriber(vec![topology::status_publish_binding(EntityType::Worker, worker_id.to_string())]);
    processor.check_heartbeats().await;

    let delivered = lost_subscriber.consume().await;
    assert_eq!(delivered.len(), 1);
    let message = StatusMessage::from_bytes(&delivered[0]).unwrap();
    assert_eq!(message.status_type, StatusType::Lost);
    assert_eq!(message.identifier, worker_id.to_string());

    // A second tick without a fresh heartbeat must not fire LOST again.
    processor.check_heartbeats().await;
    let lost_count = repo
        .statuses_for_worker(worker_id)
        .into_iter()
        .filter(|s| s.status_type == StatusType::Lost)
        .count();
    assert_eq!(lost_count, 1);
}
