//! Status Processor: the sole writer of external status history, and
//! the sole detector of workers whose heartbeat has gone stale.

pub mod config;
pub mod entities;
pub mod error;
pub mod processor;
pub mod repository;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use config::StatusConfig;
pub use entities::{ExternalStatusInfo, STATUS_EVENT_PROCESSOR_CLASS};
pub use error::StatusError;
pub use processor::StatusProcessor;
pub use repository::{PgStatusRepository, StatusRepository};
