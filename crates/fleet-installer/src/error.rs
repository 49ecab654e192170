use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    #[error("failed to launch installer command: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("installer command timed out after {0:?}")]
    TimedOut(std::time::Duration),
    #[error("installer exited with status {0}")]
    NonZeroExit(i32),
}
