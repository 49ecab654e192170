//! Shared helpers for the root-level specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::time::Duration;

pub use fleet_broker::FakeBroker;
pub use fleet_core::test_support::FakeClock;
pub use fleet_core::{EntityType, GameServerConfigId, GameServerId, StatusType, WorkerId};
pub use fleet_dal_client::{FakeDal, GameServer, GameServerConfig, ServerType};
pub use fleet_installer::FakeInstaller;
pub use fleet_process::FakeExternalProcess;
pub use fleet_wire::{topology, StatusMessage};

pub fn register_game(dal: &FakeDal) -> GameServerConfig {
    dal.insert_server(GameServer {
        game_server_id: GameServerId::new(1),
        name: "csgo".to_string(),
        server_type: ServerType::Steam,
        app_id: 740,
    });
    let config = GameServerConfig {
        game_server_config_id: GameServerConfigId::new(1),
        game_server_id: GameServerId::new(1),
        name: "default".to_string(),
        is_default: true,
        is_visible: true,
        executable: "echo".to_string(),
        args: vec!["hello".to_string()],
        env_var: vec![],
    };
    dal.insert_config(config.clone());
    config
}

/// Polls `condition` until it's true or `max_wait` elapses, sleeping
/// `SPEC_POLL_INTERVAL` between checks — used where a fake's background
/// task (e.g. a spawned `run()`) needs a tick to observe state.
pub const SPEC_POLL_INTERVAL: Duration = Duration::from_millis(5);

pub async fn wait_for<F: Fn() -> bool>(max_wait: Duration, condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + max_wait;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(SPEC_POLL_INTERVAL).await;
    }
}
