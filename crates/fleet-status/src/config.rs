use std::time::Duration;

const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_HEARTBEAT_THRESHOLD: Duration = Duration::from_secs(5);
const DEFAULT_LOOKBACK_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Connection and timing parameters for the Status Processor, loaded
/// once at startup rather than read ambiently from business logic.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub database_url: String,
    /// How often the heartbeat-timeout check runs. Should stay at most
    /// half the heartbeat threshold so detection latency stays bounded.
    pub tick_interval: Duration,
    pub heartbeat_threshold: Duration,
    /// How far back a worker's `last_heartbeat` may have been before it
    /// stops being considered a LOST candidate at all (rather than, say,
    /// a worker that was shut down months ago and never cleaned up).
    pub lookback_window: Duration,
}

impl StatusConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            heartbeat_threshold: DEFAULT_HEARTBEAT_THRESHOLD,
            lookback_window: DEFAULT_LOOKBACK_WINDOW,
        }
    }

    pub fn from_env() -> Result<Self, std::env::VarError> {
        let database_url = std::env::var("FLEET_STATUS_DATABASE_URL")?;
        let mut config = Self::new(database_url);

        if let Ok(raw) = std::env::var("FLEET_STATUS_TICK_MILLIS") {
            if let Ok(millis) = raw.parse() {
                config.tick_interval = Duration::from_millis(millis);
            }
        }
        if let Ok(raw) = std::env::var("FLEET_STATUS_HEARTBEAT_THRESHOLD_SECS") {
            if let Ok(secs) = raw.parse() {
                config.heartbeat_threshold = Duration::from_secs(secs);
            }
        }
        if let Ok(raw) = std::env::var("FLEET_STATUS_LOOKBACK_SECS") {
            if let Ok(secs) = raw.parse() {
                config.lookback_window = Duration::from_secs(secs);
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_interval_is_at_most_half_the_heartbeat_threshold() {
        let config = StatusConfig::new("postgres://localhost/fleet");
        assert!(config.tick_interval * 2 <= config.heartbeat_threshold);
    }
}
