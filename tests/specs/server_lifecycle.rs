//! Scenario 1 (start/stop round trip) and scenario 3 (STDIN forwarding)
//! from the status-type lifecycle: a `ServerSupervisor` driven through
//! install-less create/run/finish against the DAL, installer, process,
//! and broker fakes together.

use std::sync::Arc;
use std::time::Duration;

use fleet_broker::MessageSubscriber;
use fleet_core::{Command, WorkerId};
use fleet_server::ServerSupervisor;
use fleet_wire::StatusMessage;

use crate::prelude::*;

#[tokio::test]
async fn start_stop_round_trip_publishes_the_full_status_sequence() {
    let dal = Arc::new(FakeDal::new());
    let config = register_game(&dal);
    let broker = FakeBroker::new();
    let status_subscriber = broker.subscriber(vec![topology::all_status_binding()]);
    let installer = Arc::new(FakeInstaller::new());
    let external = Arc::new(FakeExternalProcess::new());
    let clock = Arc::new(FakeClock::new());
    let root = tempfile::tempdir().unwrap();

    let supervisor = ServerSupervisor::create(
        config,
        WorkerId::new(1),
        root.path(),
        dal.clone(),
        installer,
        external.clone(),
        clock,
        &broker,
    )
    .await
    .unwrap();

    let run_handle = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.run(false, Duration::from_millis(5)).await })
    };

    assert!(wait_for(Duration::from_secs(1), || external.last_spec().is_some()).await);
    external.exit_last_spawned(0);

    assert!(wait_for(Duration::from_secs(1), || supervisor.is_shutdown()).await);
    run_handle.await.unwrap();

    let instance = dal
        .instances()
        .into_iter()
        .find(|i| i.game_server_instance_id == supervisor.instance_id())
        .unwrap();
    assert!(instance.is_shutdown());

    let statuses: Vec<StatusType> = status_subscriber
        .consume()
        .await
        .iter()
        .map(|body| StatusMessage::from_bytes(body).unwrap().status_type)
        .collect();
    assert_eq!(
        statuses,
        vec![StatusType::Created, StatusType::Initializing, StatusType::Running, StatusType::Complete]
    );
}

#[tokio::test]
async fn stdin_forwarding_writes_every_line_to_the_process_in_order() {
    let dal = Arc::new(FakeDal::new());
    let config = register_game(&dal);
    let broker = FakeBroker::new();
    let installer = Arc::new(FakeInstaller::new());
    let external = Arc::new(FakeExternalProcess::new());
    let clock = Arc::new(FakeClock::new());
    let root = tempfile::tempdir().unwrap();

    let supervisor = ServerSupervisor::create(
        config,
        WorkerId::new(1),
        root.path(),
        dal.clone(),
        installer,
        external.clone(),
        clock.clone(),
        &broker,
    )
    .await
    .unwrap();

    let run_handle = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.run(false, Duration::from_millis(5)).await })
    };
    assert!(wait_for(Duration::from_secs(1), || external.last_spec().is_some()).await);
    // ProcessBuilder only forwards stdin once past its readiness delay.
    clock.advance(Duration::from_secs(21));

    supervisor
        .dispatch_command(Command::stdin(supervisor.game_server_config_id().to_string(), "say hi\n"))
        .await;
    supervisor
        .dispatch_command(Command::stdin(supervisor.game_server_config_id().to_string(), "quit\n"))
        .await;

    external.exit_last_spawned(0);
    assert!(wait_for(Duration::from_secs(1), || supervisor.is_shutdown()).await);
    run_handle.await.unwrap();

    assert_eq!(external.stdin_lines(), vec!["say hi\n".to_string(), "quit\n".to_string()]);
}
