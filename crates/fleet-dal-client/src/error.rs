use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DalError {
    #[error("request to the worker DAL failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("not found")]
    NotFound,
    #[error("already closed on {end_date}")]
    AlreadyClosed { end_date: DateTime<Utc> },
    #[error("closed, further action rejected")]
    Gone,
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl DalError {
    /// Maps the DAL's status-code contract: 404 -> NotFound, 409 -> a
    /// caller-supplied `AlreadyClosed`, 410 -> Gone, everything else ->
    /// BadRequest with the response body as the message.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            404 => DalError::NotFound,
            410 => DalError::Gone,
            _ => DalError::BadRequest(body),
        }
    }
}
