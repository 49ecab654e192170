use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_CASCADE_TIMEOUT: Duration = Duration::from_secs(30);

/// One `Config` struct per binary, loaded from environment variables
/// with explicit defaults, rather than scattered `env::var` calls in
/// `WorkerLoop` itself.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub install_root: PathBuf,
    pub heartbeat_interval: Duration,
    pub cascade_timeout: Duration,
    /// Whether a newly-started Server should run the installer before
    /// launching its process. Disabled in tests that exercise a fixed
    /// `install_root` tree already in place.
    pub should_update: bool,
}

impl WorkerConfig {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            cascade_timeout: DEFAULT_CASCADE_TIMEOUT,
            should_update: true,
        }
    }

    pub fn from_env() -> Result<Self, std::env::VarError> {
        let install_root = std::env::var("FLEET_WORKER_INSTALL_ROOT")?;
        let mut config = Self::new(install_root);

        if let Ok(raw) = std::env::var("FLEET_WORKER_HEARTBEAT_SECS") {
            if let Ok(secs) = raw.parse() {
                config.heartbeat_interval = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("FLEET_WORKER_CASCADE_TIMEOUT_SECS") {
            if let Ok(secs) = raw.parse() {
                config.cascade_timeout = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("FLEET_WORKER_SHOULD_UPDATE") {
            config.should_update = raw != "false";
        }

        Ok(config)
    }
}
