use fleet_core::{GameServerConfigId, GameServerId, GameServerInstanceId, WorkerId};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::auth::TokenCache;
use crate::config::DalConfig;
use crate::entities::{ExternalStatusInfo, GameServer, GameServerConfig, GameServerInstance, Worker};
use crate::error::DalError;

/// Typed HTTP client for the Worker DAL and Status read API. Owns one
/// `reqwest::Client` and attaches a bearer token when `credential` is
/// not `Anonymous`, acquiring and caching it via `TokenCache`.
pub struct DalClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenCache,
}

#[derive(Serialize)]
struct WorkerIdBody {
    worker_id: WorkerId,
}

#[derive(Serialize)]
struct CreateInstanceBody {
    game_server_config_id: GameServerConfigId,
    worker_id: WorkerId,
}

#[derive(Serialize)]
struct InstanceIdBody {
    game_server_instance_id: GameServerInstanceId,
}

#[derive(Debug, Deserialize)]
struct ConflictBody {
    end_date: chrono::DateTime<chrono::Utc>,
}

impl DalClient {
    pub fn new(config: DalConfig) -> Result<Self, DalError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(DalError::Request)?;
        let tokens = TokenCache::new(http.clone(), config.credential);
        Ok(Self {
            http,
            base_url: config.base_url,
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    async fn authorize(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, DalError> {
        match self.tokens.token().await {
            None => Ok(builder),
            Some(Ok(token)) => Ok(builder.bearer_auth(token)),
            Some(Err(err)) => Err(err),
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, DalError> {
        let request = self.authorize(request).await?;
        let response = request.send().await.map_err(DalError::Request)?;
        Self::handle_response(response).await
    }

    async fn send_unit(&self, request: reqwest::RequestBuilder) -> Result<(), DalError> {
        let request = self.authorize(request).await?;
        let response = request.send().await.map_err(DalError::Request)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::error_for(response).await)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, DalError> {
        if response.status().is_success() {
            return response.json::<T>().await.map_err(DalError::Request);
        }
        Err(Self::error_for(response).await)
    }

    async fn error_for(response: reqwest::Response) -> DalError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            if let Ok(conflict) = serde_json::from_str::<ConflictBody>(&body) {
                return DalError::AlreadyClosed {
                    end_date: conflict.end_date,
                };
            }
        }
        DalError::from_status(status, body)
    }

    pub async fn worker_create(&self) -> Result<Worker, DalError> {
        self.send(self.http.post(self.url("/worker/create"))).await
    }

    pub async fn worker_shutdown(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        self.send(
            self.http
                .put(self.url("/worker/shutdown"))
                .json(&WorkerIdBody { worker_id }),
        )
        .await
    }

    /// Closes every other open Worker row; the DAL itself emits the
    /// synthetic `COMPLETE` per closed worker.
    pub async fn close_other_workers(&self, worker_id: WorkerId) -> Result<(), DalError> {
        self.send_unit(
            self.http
                .put(self.url("/worker/shutdown/other"))
                .json(&WorkerIdBody { worker_id }),
        )
        .await
    }

    pub async fn worker_heartbeat(&self, worker_id: WorkerId) -> Result<Worker, DalError> {
        self.send(
            self.http
                .post(self.url("/worker/heartbeat"))
                .json(&WorkerIdBody { worker_id }),
        )
        .await
    }

    pub async fn create_instance(
        &self,
        config_id: GameServerConfigId,
        worker_id: WorkerId,
    ) -> Result<GameServerInstance, DalError> {
        self.send(
            self.http
                .post(self.url("/server/instance/create"))
                .json(&CreateInstanceBody {
                    game_server_config_id: config_id,
                    worker_id,
                }),
        )
        .await
    }

    pub async fn shutdown_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        self.send(
            self.http
                .put(self.url("/server/instance/shutdown"))
                .json(&InstanceIdBody {
                    game_server_instance_id: instance_id,
                }),
        )
        .await
    }

    pub async fn instance_heartbeat(&self, instance_id: GameServerInstanceId) -> Result<(), DalError> {
        self.send_unit(
            self.http
                .post(self.url(&format!("/server/instance/heartbeat/{instance_id}"))),
        )
        .await
    }

    pub async fn get_server(&self, game_server_id: GameServerId) -> Result<GameServer, DalError> {
        self.send(self.http.get(self.url(&format!("/server/{game_server_id}"))))
            .await
    }

    pub async fn get_config(&self, config_id: GameServerConfigId) -> Result<GameServerConfig, DalError> {
        self.send(self.http.get(self.url(&format!("/server/config/{config_id}"))))
            .await
    }

    pub async fn get_instance(&self, instance_id: GameServerInstanceId) -> Result<GameServerInstance, DalError> {
        self.send(self.http.get(self.url(&format!("/server/instance/{instance_id}"))))
            .await
    }

    pub async fn status_for_worker(&self, worker_id: WorkerId) -> Result<ExternalStatusInfo, DalError> {
        self.send(self.http.get(self.url(&format!("/status/worker/{worker_id}"))))
            .await
    }

    pub async fn status_for_instance(
        &self,
        instance_id: GameServerInstanceId,
    ) -> Result<ExternalStatusInfo, DalError> {
        self.send(self.http.get(self.url(&format!("/status/instance/{instance_id}"))))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path_without_doubling_the_slash() {
        let client = DalClient::new(DalConfig::new("http://dal.internal/")).unwrap();
        assert_eq!(client.url("/worker/create"), "http://dal.internal/worker/create");
    }
}
