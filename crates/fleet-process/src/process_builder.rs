use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fleet_core::Clock;
use tracing::warn;

use crate::error::ProcessError;
use crate::external_process::{ExternalProcess, ProcessSpec, RunningProcess};

const DEFAULT_STDIN_DELAY: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessBuilderStatus {
    NotStarted,
    Init,
    Running,
    Stopped,
    Failed,
}

/// Builds and drives one external process through
/// `NotStarted -> Init -> Running -> {Stopped | Failed}`.
///
/// `Init` lasts `stdin_delay` from the moment the process is spawned —
/// a crude substitute for an actual readiness probe, copied as-is from
/// the system this is modeled on. `stop()` has no cooperative-shutdown
/// path; it escalates straight to `kill()`.
pub struct ProcessBuilder {
    executable: PathBuf,
    args: Vec<String>,
    stdin_lines: Vec<String>,
    stdin_delay: Duration,
    extra_env: HashMap<String, String>,
    external: Arc<dyn ExternalProcess>,
    clock: Arc<dyn Clock>,
    process: Option<Box<dyn RunningProcess>>,
    start_time: Option<std::time::Instant>,
    exit_code: Option<i32>,
}

impl ProcessBuilder {
    pub fn new(executable: impl Into<PathBuf>, external: Arc<dyn ExternalProcess>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
            stdin_lines: Vec::new(),
            stdin_delay: DEFAULT_STDIN_DELAY,
            extra_env: HashMap::new(),
            external,
            clock,
            process: None,
            start_time: None,
            exit_code: None,
        }
    }

    pub fn with_stdin_delay(mut self, delay: Duration) -> Self {
        self.stdin_delay = delay;
        self
    }

    pub fn add_parameter(&mut self, parameter: impl Into<String>) {
        self.args.push(parameter.into());
    }

    pub fn add_parameter_stdin(&mut self, input: impl Into<String>) {
        self.stdin_lines.push(input.into());
    }

    pub fn set_env(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_env.insert(key.into(), value.into());
    }

    pub async fn run(&mut self) -> Result<(), ProcessError> {
        let stdin = if self.stdin_lines.is_empty() {
            Vec::new()
        } else {
            vec![self.stdin_lines.join("\n").into_bytes()]
        };
        let spec = ProcessSpec {
            executable: self.executable.clone(),
            args: self.args.clone(),
            stdin,
            extra_env: self.extra_env.clone(),
        };
        let process = self.external.spawn(spec).await?;
        self.process = Some(process);
        self.start_time = Some(self.clock.now());
        Ok(())
    }

    pub async fn status(&mut self) -> ProcessBuilderStatus {
        let Some(start_time) = self.start_time else {
            return ProcessBuilderStatus::NotStarted;
        };
        if let Some(exit_code) = self.exit_code {
            return if exit_code == 0 {
                ProcessBuilderStatus::Stopped
            } else {
                ProcessBuilderStatus::Failed
            };
        }
        if let Some(process) = self.process.as_mut() {
            if let Some(exit_code) = process.poll_exit().await {
                self.exit_code = Some(exit_code);
                return if exit_code == 0 {
                    ProcessBuilderStatus::Stopped
                } else {
                    ProcessBuilderStatus::Failed
                };
            }
        }
        if self.clock.now().duration_since(start_time) < self.stdin_delay {
            ProcessBuilderStatus::Init
        } else {
            ProcessBuilderStatus::Running
        }
    }

    pub async fn read_output(&mut self) -> (Vec<String>, Vec<String>) {
        match self.process.as_mut() {
            Some(process) => process.read_output().await,
            None => (Vec::new(), Vec::new()),
        }
    }

    pub async fn write_stdin(&mut self, line: &str) -> Result<(), ProcessError> {
        if self.status().await != ProcessBuilderStatus::Running {
            warn!("write_stdin ignored, process is not running");
            return Ok(());
        }
        match self.process.as_mut() {
            Some(process) => process.write_stdin(line).await,
            None => Ok(()),
        }
    }

    /// No cooperative shutdown exists; stopping a running process means
    /// killing it.
    pub async fn stop(&mut self) -> Result<(), ProcessError> {
        self.kill().await
    }

    pub async fn kill(&mut self) -> Result<(), ProcessError> {
        let status = self.status().await;
        if !matches!(status, ProcessBuilderStatus::Init | ProcessBuilderStatus::Running) {
            return Ok(());
        }
        match self.process.as_mut() {
            Some(process) => process.kill().await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fake::FakeExternalProcess;
    use fleet_core::test_support::FakeClock;

    fn builder(external: Arc<FakeExternalProcess>, clock: Arc<FakeClock>) -> ProcessBuilder {
        ProcessBuilder::new("dummy", external, clock)
    }

    #[tokio::test]
    async fn starts_as_not_started() {
        let external = Arc::new(FakeExternalProcess::new());
        let clock = Arc::new(FakeClock::new());
        let mut pb = builder(external, clock);
        assert_eq!(pb.status().await, ProcessBuilderStatus::NotStarted);
    }

    #[tokio::test]
    async fn is_init_until_stdin_delay_elapses_then_running() {
        let external = Arc::new(FakeExternalProcess::new());
        let clock = Arc::new(FakeClock::new());
        let mut pb = builder(external, clock.clone()).with_stdin_delay(Duration::from_secs(5));
        pb.run().await.unwrap();

        assert_eq!(pb.status().await, ProcessBuilderStatus::Init);

        clock.advance(Duration::from_secs(10));
        assert_eq!(pb.status().await, ProcessBuilderStatus::Running);
    }

    #[tokio::test]
    async fn zero_exit_code_is_stopped_nonzero_is_failed() {
        let external = Arc::new(FakeExternalProcess::new());
        let clock = Arc::new(FakeClock::new());
        let mut pb = builder(external.clone(), clock).with_stdin_delay(Duration::ZERO);
        pb.run().await.unwrap();
        external.exit_last_spawned(7);
        assert_eq!(pb.status().await, ProcessBuilderStatus::Failed);
    }

    #[tokio::test]
    async fn kill_is_a_noop_before_run() {
        let external = Arc::new(FakeExternalProcess::new());
        let clock = Arc::new(FakeClock::new());
        let mut pb = builder(external, clock);
        pb.kill().await.unwrap();
    }
}
