use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_broker::{MessagePublisher, MessageSubscriber, MessagingFabric};
use fleet_core::{
    run_loop, Clock, Command, CommandType, EntityType, GameServerConfigId, GameServerId,
    GameServerInstanceId, RunLoopHooks, StatusType, WorkerId,
};
use fleet_dal_client::{GameServerConfig, WorkerDal};
use fleet_installer::Installer;
use fleet_process::{ExternalProcess, ProcessBuilder, ProcessBuilderStatus};
use fleet_wire::{topology, CommandMessage, StatusMessage};
use tracing::{info, warn};

use crate::error::ServerError;

/// Drives one `GameServerConfig` through install, spawn, run, and
/// shutdown, publishing its lifecycle on `game_server_instance.<id>.status`
/// and reacting to commands on `game_server_instance.<id>.command`.
///
/// Mirrors `fleet_core::run_loop`'s hook shape even though a supervised
/// process's natural stop condition (it exited) doesn't come from a
/// command the way a Worker's does — `do_work` polls the process each
/// tick and latches `process_exited` once it leaves `Running`, and
/// `should_stop` just reads that latch.
pub struct ServerSupervisor {
    instance_id: GameServerInstanceId,
    game_server_id: GameServerId,
    game_server_config_id: GameServerConfigId,
    install_dir: std::path::PathBuf,
    app_id: i64,
    dal: Arc<dyn WorkerDal>,
    installer: Arc<dyn Installer>,
    publisher: Arc<dyn MessagePublisher>,
    subscriber: Arc<dyn MessageSubscriber>,
    process: tokio::sync::Mutex<ProcessBuilder>,
    should_be_running: AtomicBool,
    process_exited: AtomicBool,
    is_shutdown: AtomicBool,
}

impl ServerSupervisor {
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        config: GameServerConfig,
        worker_id: WorkerId,
        install_root: &Path,
        dal: Arc<dyn WorkerDal>,
        installer: Arc<dyn Installer>,
        external_process: Arc<dyn ExternalProcess>,
        clock: Arc<dyn Clock>,
        fabric: &dyn MessagingFabric,
    ) -> Result<Arc<Self>, ServerError> {
        let instance = dal
            .create_instance(config.game_server_config_id, worker_id)
            .await?;
        let server = dal.get_server(config.game_server_id).await?;

        let install_dir = install_root
            .join(server.server_type.dir_name())
            .join(server.app_id.to_string())
            .join(&config.name);

        let mut process = ProcessBuilder::new(install_dir.join(&config.executable), external_process, clock);
        for arg in &config.args {
            process.add_parameter(arg);
        }
        for (key, value) in config.env_pairs() {
            process.set_env(key, value);
        }

        let instance_id = instance.game_server_instance_id;
        let publisher = fabric
            .publisher(vec![topology::status_publish_binding(
                EntityType::GameServerInstance,
                instance_id.to_string(),
            )])
            .await;
        let (command_binding, command_queue) = topology::command_subscribe(EntityType::GameServerInstance, instance_id);
        let subscriber = fabric.subscriber(vec![command_binding], command_queue).await?;

        let supervisor = Arc::new(Self {
            instance_id,
            game_server_id: config.game_server_id,
            game_server_config_id: config.game_server_config_id,
            install_dir,
            app_id: server.app_id,
            dal,
            installer,
            publisher,
            subscriber,
            process: tokio::sync::Mutex::new(process),
            should_be_running: AtomicBool::new(true),
            process_exited: AtomicBool::new(false),
            is_shutdown: AtomicBool::new(false),
        });
        supervisor.publish_status(StatusType::Created).await;
        Ok(supervisor)
    }

    pub fn instance_id(&self) -> GameServerInstanceId {
        self.instance_id
    }

    pub fn game_server_id(&self) -> GameServerId {
        self.game_server_id
    }

    pub fn game_server_config_id(&self) -> GameServerConfigId {
        self.game_server_config_id
    }

    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    pub fn trigger_shutdown(&self) {
        self.should_be_running.store(false, Ordering::SeqCst);
    }

    /// Installs (if requested), spawns the process, and runs it to
    /// completion. Never returns an `Err` — an install or spawn failure
    /// is reported by going straight to `COMPLETE` rather than bubbling
    /// up, since every instance the loop starts must eventually reach a
    /// terminal status regardless of how it got there.
    pub async fn run(self: &Arc<Self>, should_update: bool, heartbeat_interval: Duration) {
        self.publish_status(StatusType::Initializing).await;

        if should_update {
            if let Err(err) = self.installer.prepare_and_wait(self.app_id, &self.install_dir).await {
                warn!(error = %err, instance_id = %self.instance_id, "installer failed, instance will not start");
                self.finish().await;
                return;
            }
        }

        if let Err(err) = self.process.lock().await.run().await {
            warn!(error = %err, instance_id = %self.instance_id, "failed to spawn game server process");
            self.finish().await;
            return;
        }
        self.publish_status(StatusType::Running).await;

        run_loop(self.as_ref(), heartbeat_interval).await;

        let (stdout, stderr) = self.process.lock().await.read_output().await;
        for line in stdout {
            info!(instance_id = %self.instance_id, %line, "stdout");
        }
        for line in stderr {
            warn!(instance_id = %self.instance_id, %line, "stderr");
        }

        self.finish().await;
    }

    pub async fn dispatch_command(&self, command: Command) {
        match command.command_type {
            CommandType::Stop => {
                info!(instance_id = %self.instance_id, "stop command received");
                self.trigger_shutdown();
            }
            CommandType::Stdin => {
                if let Some(line) = command.args.get(1) {
                    if let Err(err) = self.process.lock().await.write_stdin(line).await {
                        warn!(error = %err, instance_id = %self.instance_id, "failed to write stdin");
                    }
                }
            }
            CommandType::Start => {
                warn!(instance_id = %self.instance_id, "ignoring START command sent to a running instance");
            }
        }
    }

    async fn publish_status(&self, status_type: StatusType) {
        let message = StatusMessage::new(EntityType::GameServerInstance, self.instance_id.to_string(), status_type);
        match message.to_bytes() {
            Ok(bytes) => {
                if let Err(err) = self.publisher.publish(&bytes).await {
                    warn!(error = %err, instance_id = %self.instance_id, ?status_type, "failed to publish status");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize status message"),
        }
    }

    async fn finish(&self) {
        self.publish_status(StatusType::Complete).await;
        self.subscriber.shutdown().await;
        self.publisher.shutdown().await;
        if let Err(err) = self.dal.shutdown_instance(self.instance_id).await {
            warn!(error = %err, instance_id = %self.instance_id, "failed to record instance shutdown with the dal");
        }
        self.is_shutdown.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RunLoopHooks for ServerSupervisor {
    /// The instance-level counterpart of the Worker's heartbeat. Nothing
    /// currently reads `GameServerInstance.last_heartbeat` to synthesize
    /// `LOST` the way it does for workers, but sending it keeps the data
    /// forward-compatible with that rule being added later.
    async fn send_heartbeat(&self) {
        if let Err(err) = self.dal.instance_heartbeat(self.instance_id).await {
            warn!(error = %err, instance_id = %self.instance_id, "instance heartbeat failed");
        }
    }

    async fn do_work(&self) {
        let mut process = self.process.lock().await;
        let (stdout, stderr) = process.read_output().await;
        for line in stdout {
            info!(instance_id = %self.instance_id, %line, "stdout");
        }
        for line in stderr {
            warn!(instance_id = %self.instance_id, %line, "stderr");
        }

        if matches!(
            process.status().await,
            ProcessBuilderStatus::Stopped | ProcessBuilderStatus::Failed
        ) {
            self.process_exited.store(true, Ordering::SeqCst);
            return;
        }

        if !self.should_be_running.load(Ordering::SeqCst) {
            if let Err(err) = process.kill().await {
                warn!(error = %err, instance_id = %self.instance_id, "failed to kill process");
            }
        }
    }

    async fn handle_commands(&self) {
        for body in self.subscriber.consume().await {
            match CommandMessage::from_bytes(&body) {
                Ok(message) => self.dispatch_command(message.command).await,
                Err(err) => warn!(error = %err, instance_id = %self.instance_id, "dropping malformed command message"),
            }
        }
    }

    fn should_stop(&self) -> bool {
        self.process_exited.load(Ordering::SeqCst)
    }
}
