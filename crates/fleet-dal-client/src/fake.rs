//! An in-memory stand-in for the Worker DAL, used by `fleet-server` and
//! `fleet-worker`'s tests so the Server Supervisor / Worker Loop can be
//! exercised without a live DAL HTTP service.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use fleet_core::{GameServerConfigId, GameServerId, GameServerInstanceId, WorkerId};
use parking_lot::Mutex;

use crate::dal::WorkerDal;
use crate::entities::{ExternalStatusInfo, GameServer, GameServerConfig, GameServerInstance, Worker};
use crate::error::DalError;

#[derive(Default)]
struct State {
    next_worker_id: i64,
    next_instance_id: i64,
    workers: Vec<Worker>,
    instances: Vec<GameServerInstance>,
    servers: HashMap<i64, GameServer>,
    configs: HashMap<i64, GameServerConfig>,
    statuses_worker: HashMap<i64, ExternalStatusInfo>,
    statuses_instance: HashMap<i64, ExternalStatusInfo>,
}

#[derive(Default)]
pub struct FakeDal {
    state: Mutex<State>,
}

impl FakeDal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_server(&self, server: GameServer) {
        self.state.lock().servers.insert(server.game_server_id.get(), server);
    }

    pub fn insert_config(&self, config: GameServerConfig) {
        self.state
            .lock()
            .configs
            .insert(config.game_server_config_id.get(), config);
    }

    pub fn workers(&self) -> Vec<Worker> {
        self.state.lock().workers.clone()
    }

    pub fn instances(&self) -> Vec<GameServerInstance> {
        self.state.lock().instances.clone()
    }
}

#[async_trait]
impl WorkerDal for FakeDal {
    async fn worker_create(&self) -> Result<Worker, DalError> {
        let mut state = self.state.lock();
        state.next_worker_id += 1;
        let worker = Worker {
            worker_id: WorkerId::new(state.next_worker_id),
            created_date: Utc::now(),
            last_heartbeat: Utc::now(),
            end_date: None,
        };
        state.workers.push(worker.clone());
        Ok(worker)
    }

    async fn worker_shutdown(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        let mut state = self.state.lock();
        let worker = state
            .workers
            .iter_mut()
            .find(|w| w.worker_id == worker_id)
            .ok_or(DalError::NotFound)?;
        if let Some(end_date) = worker.end_date {
            return Err(DalError::AlreadyClosed { end_date });
        }
        worker.end_date = Some(Utc::now());
        Ok(worker.clone())
    }

    /// Mirrors the real DAL's `/worker/shutdown/other` closing every
    /// other open worker. Unlike the real DAL, this fake does not also
    /// publish the synthetic `COMPLETE` those closures trigger — tests
    /// that need that behavior observed exercise it through the
    /// `fleet-status` repository directly instead.
    async fn close_other_workers(&self, worker_id: WorkerId) -> Result<(), DalError> {
        let mut state = self.state.lock();
        let now = Utc::now();
        for worker in state.workers.iter_mut() {
            if worker.worker_id != worker_id && worker.end_date.is_none() {
                worker.end_date = Some(now);
            }
        }
        Ok(())
    }

    async fn worker_heartbeat(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        let mut state = self.state.lock();
        let worker = state
            .workers
            .iter_mut()
            .find(|w| w.worker_id == worker_id)
            .ok_or(DalError::Gone)?;
        if worker.end_date.is_some() {
            return Err(DalError::Gone);
        }
        worker.last_heartbeat = Utc::now();
        Ok(worker.clone())
    }

    async fn create_instance(
        &self,
        config_id: GameServerConfigId,
        worker_id: WorkerId,
    ) -> Result<GameServerInstance, DalError> {
        let mut state = self.state.lock();
        state.next_instance_id += 1;
        let instance = GameServerInstance {
            game_server_instance_id: GameServerInstanceId::new(state.next_instance_id),
            game_server_config_id: config_id,
            worker_id,
            created_date: Utc::now(),
            last_heartbeat: Utc::now(),
            end_date: None,
        };
        state.instances.push(instance.clone());
        Ok(instance)
    }

    async fn shutdown_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.game_server_instance_id == instance_id)
            .ok_or(DalError::NotFound)?;
        if let Some(end_date) = instance.end_date {
            return Err(DalError::AlreadyClosed { end_date });
        }
        instance.end_date = Some(Utc::now());
        Ok(instance.clone())
    }

    async fn instance_heartbeat(&self, instance_id: GameServerInstanceId) -> Result<(), DalError> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.game_server_instance_id == instance_id)
            .ok_or(DalError::Gone)?;
        if instance.end_date.is_some() {
            return Err(DalError::Gone);
        }
        instance.last_heartbeat = Utc::now();
        Ok(())
    }

    async fn get_server(&self, game_server_id: GameServerId) -> Result<GameServer, DalError> {
        self.state
            .lock()
            .servers
            .get(&game_server_id.get())
            .cloned()
            .ok_or(DalError::NotFound)
    }

    async fn get_config(&self, config_id: GameServerConfigId) -> Result<GameServerConfig, DalError> {
        self.state
            .lock()
            .configs
            .get(&config_id.get())
            .cloned()
            .ok_or(DalError::NotFound)
    }

    async fn get_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        self.state
            .lock()
            .instances
            .iter()
            .find(|i| i.game_server_instance_id == instance_id)
            .cloned()
            .ok_or(DalError::NotFound)
    }

    async fn status_for_worker(&self, worker_id: WorkerId) -> Result<ExternalStatusInfo, DalError> {
        self.state
            .lock()
            .statuses_worker
            .get(&worker_id.get())
            .cloned()
            .ok_or(DalError::NotFound)
    }

    async fn status_for_instance(&self, instance_id: GameServerInstanceId) -> Result<ExternalStatusInfo, DalError> {
        self.state
            .lock()
            .statuses_instance
            .get(&instance_id.get())
            .cloned()
            .ok_or(DalError::NotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shutting_down_an_already_closed_worker_is_a_conflict() {
        let dal = FakeDal::new();
        let worker = dal.worker_create().await.unwrap();
        dal.worker_shutdown(worker.worker_id).await.unwrap();
        let result = dal.worker_shutdown(worker.worker_id).await;
        assert!(matches!(result, Err(DalError::AlreadyClosed { .. })));
    }

    #[tokio::test]
    async fn close_other_workers_leaves_only_the_named_worker_open() {
        let dal = FakeDal::new();
        let first = dal.worker_create().await.unwrap();
        let second = dal.worker_create().await.unwrap();
        dal.close_other_workers(second.worker_id).await.unwrap();

        let workers = dal.workers();
        let first = workers.iter().find(|w| w.worker_id == first.worker_id).unwrap();
        let second = workers.iter().find(|w| w.worker_id == second.worker_id).unwrap();
        assert!(first.end_date.is_some());
        assert!(second.end_date.is_none());
    }

    #[tokio::test]
    async fn heartbeat_on_a_closed_worker_is_gone() {
        let dal = FakeDal::new();
        let worker = dal.worker_create().await.unwrap();
        dal.worker_shutdown(worker.worker_id).await.unwrap();
        let result = dal.worker_heartbeat(worker.worker_id).await;
        assert!(matches!(result, Err(DalError::Gone)));
    }
}
