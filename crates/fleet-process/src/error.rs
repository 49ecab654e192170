use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {executable}: {source}")]
    SpawnFailed {
        executable: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to stdin: {0}")]
    StdinWrite(#[source] std::io::Error),
    #[error("failed to kill process: {0}")]
    KillFailed(#[source] std::io::Error),
    #[error("write_stdin called while process is not running")]
    NotRunning,
}
