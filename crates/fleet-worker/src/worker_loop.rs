use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_broker::{MessagePublisher, MessageSubscriber, MessagingFabric};
use fleet_core::{
    run_loop, Clock, Command, CommandType, EntityType, GameServerConfigId, RunLoopHooks, StatusType, WorkerId,
};
use fleet_dal_client::WorkerDal;
use fleet_installer::Installer;
use fleet_process::ExternalProcess;
use fleet_server::ServerSupervisor;
use fleet_wire::{topology, CommandMessage, StatusMessage};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::WorkerConfig;
use crate::error::WorkerError;

const CASCADE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Supervises a dynamic set of `ServerSupervisor`s for one host. Each
/// started Server runs on its own `tokio::spawn`ed task; `servers` holds
/// only the handles, guarded by a `parking_lot::Mutex` that is never
/// held across an `.await`.
pub struct WorkerLoop {
    worker_id: WorkerId,
    dal: Arc<dyn WorkerDal>,
    installer: Arc<dyn Installer>,
    external_process: Arc<dyn ExternalProcess>,
    clock: Arc<dyn Clock>,
    fabric: Arc<dyn MessagingFabric>,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
    servers: Mutex<Vec<Arc<ServerSupervisor>>>,
    install_root: PathBuf,
    should_update: bool,
    cascade_timeout: Duration,
    heartbeat_interval: Duration,
    stopped: AtomicBool,
}

impl WorkerLoop {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        config: &WorkerConfig,
        dal: Arc<dyn WorkerDal>,
        installer: Arc<dyn Installer>,
        external_process: Arc<dyn ExternalProcess>,
        clock: Arc<dyn Clock>,
        fabric: Arc<dyn MessagingFabric>,
    ) -> Result<Arc<Self>, WorkerError> {
        let worker = dal.worker_create().await?;
        let worker_id = worker.worker_id;
        dal.close_other_workers(worker_id).await?;

        let publisher = fabric
            .publisher(vec![topology::status_publish_binding(
                EntityType::Worker,
                worker_id.to_string(),
            )])
            .await;
        let (command_binding, command_queue) = topology::command_subscribe(EntityType::Worker, worker_id);
        let subscriber = fabric.subscriber(vec![command_binding], command_queue).await?;

        let worker_loop = Arc::new(Self {
            worker_id,
            dal,
            installer,
            external_process,
            clock,
            fabric,
            publisher,
            subscriber,
            servers: Mutex::new(Vec::new()),
            install_root: config.install_root.clone(),
            should_update: config.should_update,
            cascade_timeout: config.cascade_timeout,
            heartbeat_interval: config.heartbeat_interval,
            stopped: AtomicBool::new(false),
        });
        worker_loop.publish_status(StatusType::Created).await;
        Ok(worker_loop)
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    pub async fn run(self: &Arc<Self>) {
        self.publish_status(StatusType::Running).await;
        run_loop(self.as_ref(), self.heartbeat_interval).await;
    }

    async fn publish_status(&self, status_type: StatusType) {
        let message = StatusMessage::new(EntityType::Worker, self.worker_id.to_string(), status_type);
        match message.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.publisher.publish(&bytes).await {
                    warn!(error = %err, worker_id = %self.worker_id, ?status_type, "failed to publish status");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize status message"),
        }
    }

    async fn dispatch_command(&self, command: Command) {
        match command.command_type {
            CommandType::Start => self.handle_start(command.args).await,
            CommandType::Stop if command.args.is_empty() => self.cascade_shutdown().await,
            CommandType::Stop => self.handle_stop(command.args).await,
            CommandType::Stdin => self.handle_stdin(command.args).await,
        }
    }

    async fn handle_start(&self, args: Vec<String>) {
        let Some(raw_config_id) = args.first() else {
            warn!(worker_id = %self.worker_id, "START command missing a config id, dropping");
            return;
        };
        let Ok(raw_config_id) = raw_config_id.parse::<i64>() else {
            warn!(worker_id = %self.worker_id, "START command has a non-numeric config id, dropping");
            return;
        };
        let config_id = GameServerConfigId::new(raw_config_id);

        let config = match self.dal.get_config(config_id).await {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, %config_id, "failed to fetch game server config, dropping START");
                return;
            }
        };

        let already_running = self
            .servers
            .lock()
            .iter()
            .any(|server| server.game_server_id() == config.game_server_id);
        if already_running {
            warn!(game_server_id = %config.game_server_id, "a server for this game is already running, ignoring START");
            return;
        }

        let server = match ServerSupervisor::create(
            config,
            self.worker_id,
            &self.install_root,
            Arc::clone(&self.dal),
            Arc::clone(&self.installer),
            Arc::clone(&self.external_process),
            Arc::clone(&self.clock),
            self.fabric.as_ref(),
        )
        .await
        {
            Ok(server) => server,
            Err(err) => {
                warn!(error = %err, %config_id, "failed to create server supervisor");
                return;
            }
        };

        self.servers.lock().push(Arc::clone(&server));

        let should_update = self.should_update;
        let heartbeat_interval = self.heartbeat_interval;
        tokio::spawn(async move {
            server.run(should_update, heartbeat_interval).await;
        });
    }

    async fn handle_stop(&self, args: Vec<String>) {
        let Some(config_id) = self.resolve_config_id(&args, "STOP") else {
            return;
        };
        match self.find_server(config_id) {
            Some(server) => server.trigger_shutdown(),
            None => warn!(%config_id, "STOP addressed a config with no running server, dropping"),
        }
    }

    async fn handle_stdin(&self, args: Vec<String>) {
        let Some(config_id) = self.resolve_config_id(&args, "STDIN") else {
            return;
        };
        let Some(server) = self.find_server(config_id) else {
            warn!(%config_id, "STDIN addressed a config with no running server, dropping");
            return;
        };
        for line in &args[1..] {
            server
                .dispatch_command(Command::stdin(config_id.to_string(), line.clone()))
                .await;
        }
    }

    fn resolve_config_id(&self, args: &[String], command_name: &str) -> Option<GameServerConfigId> {
        let raw = args.first()?;
        match raw.parse::<i64>() {
            Ok(id) => Some(GameServerConfigId::new(id)),
            Err(_) => {
                warn!(worker_id = %self.worker_id, command_name, "command has a non-numeric config id, dropping");
                None
            }
        }
    }

    fn find_server(&self, config_id: GameServerConfigId) -> Option<Arc<ServerSupervisor>> {
        self.servers
            .lock()
            .iter()
            .find(|server| server.game_server_config_id() == config_id)
            .cloned()
    }

    /// Worker-driven ordered termination of every extant Server before
    /// closing itself. Triggers every non-shutdown Server, then polls
    /// each with a bounded wait rather than blocking indefinitely on a
    /// slow or stuck process.
    async fn cascade_shutdown(&self) {
        let snapshot: Vec<Arc<ServerSupervisor>> = {
            let servers = self.servers.lock();
            servers.iter().filter(|server| !server.is_shutdown()).cloned().collect()
        };

        for server in &snapshot {
            server.trigger_shutdown();
        }

        for server in &snapshot {
            let deadline = self.clock.now() + self.cascade_timeout;
            loop {
                if server.is_shutdown() {
                    info!(instance_id = %server.instance_id(), "server shut down within the cascade bound");
                    break;
                }
                if self.clock.now() >= deadline {
                    warn!(instance_id = %server.instance_id(), "server did not shut down within the cascade bound");
                    break;
                }
                tokio::time::sleep(CASCADE_POLL_INTERVAL).await;
            }
        }

        if let Err(err) = self.dal.worker_shutdown(self.worker_id).await {
            warn!(error = %err, worker_id = %self.worker_id, "failed to record worker shutdown with the dal");
        }
        self.publish_status(StatusType::Complete).await;
        self.subscriber.shutdown().await;
        self.publisher.shutdown().await;
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RunLoopHooks for WorkerLoop {
    async fn send_heartbeat(&self) {
        if let Err(err) = self.dal.worker_heartbeat(self.worker_id).await {
            warn!(error = %err, worker_id = %self.worker_id, "worker heartbeat failed");
        }
    }

    async fn do_work(&self) {
        self.servers.lock().retain(|server| !server.is_shutdown());
    }

    async fn handle_commands(&self) {
        for body in self.subscriber.consume().await {
            match CommandMessage::from_bytes(&body) {
                Ok(message) => self.dispatch_command(message.command).await,
                Err(err) => warn!(error = %err, worker_id = %self.worker_id, "dropping malformed command message"),
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fleet_broker::FakeBroker;
    use fleet_core::test_support::FakeClock;
    use fleet_core::GameServerId;
    use fleet_dal_client::{FakeDal, GameServer, GameServerConfig, ServerType};
    use fleet_installer::FakeInstaller;
    use fleet_process::FakeExternalProcess;
    use tempfile::tempdir;

    fn test_worker_config(root: &std::path::Path) -> WorkerConfig {
        let mut config = WorkerConfig::new(root);
        config.should_update = false;
        config
    }

    fn install_game(dal: &FakeDal) {
        dal.insert_server(GameServer {
            game_server_id: GameServerId::new(1),
            name: "csgo".to_string(),
            server_type: ServerType::Steam,
            app_id: 740,
        });
        dal.insert_config(GameServerConfig {
            game_server_config_id: GameServerConfigId::new(1),
            game_server_id: GameServerId::new(1),
            name: "default".to_string(),
            is_default: true,
            is_visible: true,
            executable: "srcds_run".to_string(),
            args: vec![],
            env_var: vec![],
        });
    }

    #[tokio::test]
    async fn create_registers_with_the_dal_and_closes_other_workers() {
        let dal = Arc::new(FakeDal::new());
        let existing = dal.worker_create().await.unwrap();
        let fabric: Arc<dyn MessagingFabric> = Arc::new(FakeBroker::new());
        let root = tempdir().unwrap();

        let worker = WorkerLoop::create(
            &test_worker_config(root.path()),
            dal.clone(),
            Arc::new(FakeInstaller::new()),
            Arc::new(FakeExternalProcess::new()),
            Arc::new(FakeClock::new()),
            fabric,
        )
        .await
        .unwrap();

        let workers = dal.workers();
        let previous = workers.iter().find(|w| w.worker_id == existing.worker_id).unwrap();
        assert!(previous.end_date.is_some());
        assert_ne!(worker.worker_id(), existing.worker_id);
    }

    #[tokio::test]
    async fn start_command_spawns_a_server_and_duplicate_start_is_ignored() {
        let dal = Arc::new(FakeDal::new());
        install_game(&dal);
        let fabric: Arc<dyn MessagingFabric> = Arc::new(FakeBroker::new());
        let root = tempdir().unwrap();

        let worker = WorkerLoop::create(
            &test_worker_config(root.path()),
            dal.clone(),
            Arc::new(FakeInstaller::new()),
            Arc::new(FakeExternalProcess::new()),
            Arc::new(FakeClock::new()),
            fabric,
        )
        .await
        .unwrap();

        worker.handle_start(vec!["1".to_string()]).await;
        assert_eq!(worker.servers.lock().len(), 1);

        worker.handle_start(vec!["1".to_string()]).await;
        assert_eq!(worker.servers.lock().len(), 1, "duplicate START must not spawn a second server");
    }

    #[tokio::test]
    async fn cascade_shutdown_waits_for_servers_then_shuts_down_the_worker() {
        let dal = Arc::new(FakeDal::new());
        install_game(&dal);
        let broker = FakeBroker::new();
        let fabric: Arc<dyn MessagingFabric> = Arc::new(broker);
        let clock = Arc::new(FakeClock::new());
        let root = tempdir().unwrap();
        let external = Arc::new(FakeExternalProcess::new());

        let worker = WorkerLoop::create(
            &test_worker_config(root.path()),
            dal.clone(),
            Arc::new(FakeInstaller::new()),
            external.clone(),
            clock.clone(),
            fabric,
        )
        .await
        .unwrap();

        worker.handle_start(vec!["1".to_string()]).await;
        let server = worker.servers.lock()[0].clone();
        external.exit_last_spawned(0);

        worker.cascade_shutdown().await;

        assert!(server.is_shutdown());
        assert!(worker.should_stop());
        let workers = dal.workers();
        let record = workers.iter().find(|w| w.worker_id == worker.worker_id()).unwrap();
        assert!(record.end_date.is_some());
    }
}
