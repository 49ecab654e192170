//! Typed HTTP client for the two out-of-scope data-plane collaborators
//! this core talks to: the Worker DAL (create/shutdown/heartbeat Worker
//! and GameServerInstance rows, read the GameServer catalog) and the
//! Status read API. Implements the consuming side only — no HTTP server.

pub mod auth;
pub mod client;
pub mod config;
pub mod dal;
pub mod entities;
pub mod error;

pub use auth::{AccessToken, Credential};
pub use client::DalClient;
pub use config::DalConfig;
pub use dal::WorkerDal;
pub use entities::{ExternalStatusInfo, GameServer, GameServerConfig, GameServerInstance, ServerType, Worker};
pub use error::DalError;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDal;
