use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::error::ProcessError;

#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub stdin: Vec<Vec<u8>>,
    pub extra_env: HashMap<String, String>,
}

/// A real OS process or a test double, abstracted so `ProcessBuilder`
/// never touches `tokio::process` directly.
#[async_trait]
pub trait ExternalProcess: Send + Sync {
    async fn spawn(&self, spec: ProcessSpec) -> Result<Box<dyn RunningProcess>, ProcessError>;
}

/// A handle to one spawned process.
#[async_trait]
pub trait RunningProcess: Send + Sync {
    /// `None` while still running, `Some(exit_code)` once it has exited.
    async fn poll_exit(&mut self) -> Option<i32>;
    /// Drains whatever stdout/stderr lines have arrived since the last
    /// call, without blocking.
    async fn read_output(&mut self) -> (Vec<String>, Vec<String>);
    async fn write_stdin(&mut self, line: &str) -> Result<(), ProcessError>;
    async fn kill(&mut self) -> Result<(), ProcessError>;
}

#[derive(Clone, Copy, Default)]
pub struct RealExternalProcess;

#[async_trait]
impl ExternalProcess for RealExternalProcess {
    async fn spawn(&self, spec: ProcessSpec) -> Result<Box<dyn RunningProcess>, ProcessError> {
        let mut command = Command::new(&spec.executable);
        command
            .args(&spec.args)
            .envs(&spec.extra_env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        let mut child = command.spawn().map_err(|source| ProcessError::SpawnFailed {
            executable: spec.executable.display().to_string(),
            source,
        })?;

        if !spec.stdin.is_empty() {
            if let Some(mut stdin) = child.stdin.take() {
                for chunk in &spec.stdin {
                    stdin
                        .write_all(chunk)
                        .await
                        .map_err(ProcessError::StdinWrite)?;
                }
            }
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let (stdout_tx, stdout_rx) = mpsc::unbounded_channel();
        let (stderr_tx, stderr_rx) = mpsc::unbounded_channel();

        if let Some(stdout) = stdout {
            tokio::spawn(stream_lines(stdout, stdout_tx));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(stream_lines(stderr, stderr_tx));
        }

        Ok(Box::new(RealRunningProcess {
            child,
            stdout_rx,
            stderr_rx,
        }))
    }
}

async fn stream_lines<R: tokio::io::AsyncRead + Unpin>(reader: R, sender: mpsc::UnboundedSender<String>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if sender.send(line).is_err() {
            return;
        }
    }
}

struct RealRunningProcess {
    child: tokio::process::Child,
    stdout_rx: mpsc::UnboundedReceiver<String>,
    stderr_rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl RunningProcess for RealRunningProcess {
    async fn poll_exit(&mut self) -> Option<i32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.code().unwrap_or(-1)),
            _ => None,
        }
    }

    async fn read_output(&mut self) -> (Vec<String>, Vec<String>) {
        let mut stdout = Vec::new();
        while let Ok(line) = self.stdout_rx.try_recv() {
            stdout.push(line);
        }
        let mut stderr = Vec::new();
        while let Ok(line) = self.stderr_rx.try_recv() {
            stderr.push(line);
        }
        (stdout, stderr)
    }

    async fn write_stdin(&mut self, line: &str) -> Result<(), ProcessError> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or(ProcessError::NotRunning)?;
        let mut payload = line.to_string();
        if !payload.ends_with('\n') {
            payload.push('\n');
        }
        stdin
            .write_all(payload.as_bytes())
            .await
            .map_err(ProcessError::StdinWrite)?;
        stdin.flush().await.map_err(ProcessError::StdinWrite)
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        self.child.kill().await.map_err(ProcessError::KillFailed)
    }
}
