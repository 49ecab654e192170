//! Test double for `ExternalProcess`/`RunningProcess`, so `ProcessBuilder`
//! and its callers can be tested without spawning real OS processes.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ProcessError;
use crate::external_process::{ExternalProcess, ProcessSpec, RunningProcess};

#[derive(Default)]
struct FakeState {
    exit_code: Option<i32>,
    stdout: VecDeque<String>,
    stderr: VecDeque<String>,
    stdin: Vec<String>,
    killed: bool,
    spec: Option<ProcessSpec>,
}

/// Spawns `FakeRunningProcess` handles sharing state the test can
/// reach into: queue output lines, force an exit code, or check whether
/// a spawned process was killed.
#[derive(Default)]
pub struct FakeExternalProcess {
    spawned: Mutex<Vec<Arc<Mutex<FakeState>>>>,
}

impl FakeExternalProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exit_last_spawned(&self, code: i32) {
        if let Some(state) = self.spawned.lock().last() {
            state.lock().exit_code = Some(code);
        }
    }

    pub fn push_stdout_line(&self, line: impl Into<String>) {
        if let Some(state) = self.spawned.lock().last() {
            state.lock().stdout.push_back(line.into());
        }
    }

    pub fn was_last_killed(&self) -> bool {
        self.spawned
            .lock()
            .last()
            .map(|state| state.lock().killed)
            .unwrap_or(false)
    }

    pub fn stdin_lines(&self) -> Vec<String> {
        self.spawned
            .lock()
            .last()
            .map(|state| state.lock().stdin.clone())
            .unwrap_or_default()
    }

    pub fn last_spec(&self) -> Option<ProcessSpec> {
        self.spawned.lock().last().and_then(|state| state.lock().spec.clone())
    }
}

#[async_trait]
impl ExternalProcess for FakeExternalProcess {
    async fn spawn(&self, spec: ProcessSpec) -> Result<Box<dyn RunningProcess>, ProcessError> {
        let state = Arc::new(Mutex::new(FakeState {
            spec: Some(spec),
            ..FakeState::default()
        }));
        self.spawned.lock().push(Arc::clone(&state));
        Ok(Box::new(FakeRunningProcess { state }))
    }
}

struct FakeRunningProcess {
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl RunningProcess for FakeRunningProcess {
    async fn poll_exit(&mut self) -> Option<i32> {
        self.state.lock().exit_code
    }

    async fn read_output(&mut self) -> (Vec<String>, Vec<String>) {
        let mut state = self.state.lock();
        (state.stdout.drain(..).collect(), state.stderr.drain(..).collect())
    }

    async fn write_stdin(&mut self, line: &str) -> Result<(), ProcessError> {
        self.state.lock().stdin.push(line.to_string());
        Ok(())
    }

    async fn kill(&mut self) -> Result<(), ProcessError> {
        let mut state = self.state.lock();
        state.killed = true;
        state.exit_code.get_or_insert(-1);
        Ok(())
    }
}
