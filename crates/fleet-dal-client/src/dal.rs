use async_trait::async_trait;
use fleet_core::{GameServerConfigId, GameServerId, GameServerInstanceId, WorkerId};

use crate::entities::{ExternalStatusInfo, GameServer, GameServerConfig, GameServerInstance, Worker};
use crate::error::DalError;

/// What a Server Supervisor or Worker Loop needs from the Worker DAL,
/// independent of whether it's backed by a live HTTP client or the
/// in-memory `FakeDal` used in tests — the same capability-trait
/// pattern as `fleet_broker::MessagingFabric`.
#[async_trait]
pub trait WorkerDal: Send + Sync {
    async fn worker_create(&self) -> Result<Worker, DalError>;
    async fn worker_shutdown(&self, worker_id: WorkerId) -> Result<Worker, DalError>;
    async fn close_other_workers(&self, worker_id: WorkerId) -> Result<(), DalError>;
    async fn worker_heartbeat(&self, worker_id: WorkerId) -> Result<Worker, DalError>;
    async fn create_instance(
        &self,
        config_id: GameServerConfigId,
        worker_id: WorkerId,
    ) -> Result<GameServerInstance, DalError>;
    async fn shutdown_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError>;
    async fn instance_heartbeat(&self, instance_id: GameServerInstanceId) -> Result<(), DalError>;
    async fn get_server(&self, game_server_id: GameServerId) -> Result<GameServer, DalError>;
    async fn get_config(&self, config_id: GameServerConfigId) -> Result<GameServerConfig, DalError>;
    async fn get_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError>;
    async fn status_for_worker(&self, worker_id: WorkerId) -> Result<ExternalStatusInfo, DalError>;
    async fn status_for_instance(&self, instance_id: GameServerInstanceId) -> Result<ExternalStatusInfo, DalError>;
}

#[async_trait]
impl WorkerDal for crate::client::DalClient {
    async fn worker_create(&self) -> Result<Worker, DalError> {
        crate::client::DalClient::worker_create(self).await
    }

    async fn worker_shutdown(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        crate::client::DalClient::worker_shutdown(self, worker_id).await
    }

    async fn close_other_workers(&self, worker_id: WorkerId) -> Result<(), DalError> {
        crate::client::DalClient::close_other_workers(self, worker_id).await
    }

    async fn worker_heartbeat(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        crate::client::DalClient::worker_heartbeat(self, worker_id).await
    }

    async fn create_instance(
        &self,
        config_id: GameServerConfigId,
        worker_id: WorkerId,
    ) -> Result<GameServerInstance, DalError> {
        crate::client::DalClient::create_instance(self, config_id, worker_id).await
    }

    async fn shutdown_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        crate::client::DalClient::shutdown_instance(self, instance_id).await
    }

    async fn instance_heartbeat(&self, instance_id: GameServerInstanceId) -> Result<(), DalError> {
        crate::client::DalClient::instance_heartbeat(self, instance_id).await
    }

    async fn get_server(&self, game_server_id: GameServerId) -> Result<GameServer, DalError> {
        crate::client::DalClient::get_server(self, game_server_id).await
    }

    async fn get_config(&self, config_id: GameServerConfigId) -> Result<GameServerConfig, DalError> {
        crate::client::DalClient::get_config(self, config_id).await
    }

    async fn get_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        crate::client::DalClient::get_instance(self, instance_id).await
    }

    async fn status_for_worker(&self, worker_id: WorkerId) -> Result<ExternalStatusInfo, DalError> {
        crate::client::DalClient::status_for_worker(self, worker_id).await
    }

    async fn status_for_instance(&self, instance_id: GameServerInstanceId) -> Result<ExternalStatusInfo, DalError> {
        crate::client::DalClient::status_for_instance(self, instance_id).await
    }
}
