//! Server Supervisor: owns one `GameServerConfig`'s running process from
//! install through exit, publishing its lifecycle and reacting to
//! `START`/`STOP`/`STDIN` commands scoped to its instance.

pub mod error;
pub mod supervisor;

pub use error::ServerError;
pub use supervisor::ServerSupervisor;
