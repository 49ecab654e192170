use std::time::Duration;

/// How the `RobustConnection` authenticates and where it reconnects.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub uri: String,
    pub heartbeat: Duration,
    pub max_reconnect_attempts: Option<u32>,
    pub initial_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub backoff_multiplier: f64,
    pub tls: TlsConfig,
}

impl BrokerConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            heartbeat: Duration::from_secs(30),
            max_reconnect_attempts: None,
            initial_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            backoff_multiplier: 1.5,
            tls: TlsConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, std::env::VarError> {
        let uri = std::env::var("FLEET_BROKER_URI")?;
        let mut config = Self::new(uri);
        if let Ok(raw) = std::env::var("FLEET_BROKER_HEARTBEAT_SECS") {
            if let Ok(secs) = raw.parse() {
                config.heartbeat = Duration::from_secs(secs);
            }
        }
        if std::env::var("FLEET_BROKER_TLS").as_deref() == Ok("true") {
            let server_name = std::env::var("FLEET_BROKER_TLS_HOSTNAME")
                .map_err(|_| std::env::VarError::NotPresent)?;
            config.tls = TlsConfig {
                enabled: true,
                server_name: Some(server_name),
                accept_invalid_certs: false,
            };
        }
        Ok(config)
    }
}

/// Minimum TLS1.2, hostname verification always on; `accept_invalid_certs`
/// exists only for local/dev brokers and must never be set in production
/// configuration. `server_name` is read once at startup and reused
/// across every reconnect attempt, even if the connection URI's host
/// ever differs (e.g. a load-balanced address).
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enabled: bool,
    pub server_name: Option<String>,
    pub accept_invalid_certs: bool,
}
