use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lapin::{Connection, ConnectionProperties};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::BrokerConfig;
use crate::error::BrokerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Reconnecting,
}

/// Owns one `lapin::Connection`, watching it for loss and reconnecting
/// with exponential backoff. Publishers and subscribers subscribe to
/// `state()` to learn when a reconnect has completed so they can
/// reinitialize their channel.
pub struct RobustConnection {
    config: BrokerConfig,
    connection: RwLock<Connection>,
    state_tx: watch::Sender<ConnectionState>,
    should_stop: AtomicBool,
    stale: AtomicBool,
}

impl RobustConnection {
    /// Fails fast: the initial dial happens inline so a misconfigured
    /// broker is reported to the caller immediately, before any
    /// background reconnect logic starts.
    pub async fn connect(config: BrokerConfig) -> Result<Arc<Self>, BrokerError> {
        let connection = dial(&config).await?;
        let (state_tx, _) = watch::channel(ConnectionState::Connected);
        let this = Arc::new(Self {
            config,
            connection: RwLock::new(connection),
            state_tx,
            should_stop: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        });
        tokio::spawn(watchdog(Arc::clone(&this)));
        Ok(this)
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Stops the watchdog and closes the held transport. Idempotent:
    /// closing an already-closed `lapin::Connection` is a no-op on its
    /// end.
    pub fn close(&self) {
        self.should_stop.store(true, Ordering::SeqCst);
        let connection = self.connection.read().clone();
        tokio::spawn(async move {
            let _ = connection.close(0, "robust connection closed").await;
        });
    }

    /// Probes the held connection and opens a fresh channel on it.
    /// A connection that reports `connected()` but fails to open a
    /// channel is idle-stale; callers get `ConnectionClosed` either way.
    /// The idle-stale case also flags the watchdog to start
    /// reconnecting, since `status().connected()` alone would never
    /// notice it.
    pub async fn channel(&self) -> Result<lapin::Channel, BrokerError> {
        let connection = self.connection.read().clone();
        if !connection.status().connected() {
            return Err(BrokerError::ConnectionClosed);
        }
        connection.create_channel().await.map_err(|err| {
            warn!(error = %err, "channel open failed on a connection reporting open; treating as idle-stale");
            self.stale.store(true, Ordering::SeqCst);
            BrokerError::ConnectionClosed
        })
    }

    fn is_connected(&self) -> bool {
        self.connection.read().status().connected()
    }

    /// Consumes the idle-stale flag: `true` if `channel()` observed a
    /// stale connection since the last check.
    fn take_stale(&self) -> bool {
        self.stale.swap(false, Ordering::SeqCst)
    }

    async fn replace_connection(&self, fresh: Connection) {
        *self.connection.write() = fresh;
    }
}

/// One dial attempt. When TLS is configured, builds a fresh `AMQPUri`
/// each call (never cached across attempts) forcing the `amqps` scheme
/// and the pinned `server_name` from configuration — `lapin`'s own
/// rustls connector then builds a new TLS context per connection, with
/// hostname verification against that pinned name rather than whatever
/// host happens to appear in a load-balanced connection URI.
async fn dial(config: &BrokerConfig) -> Result<Connection, BrokerError> {
    let properties = ConnectionProperties::default()
        .with_executor(tokio_executor_trait::Tokio::current())
        .with_reactor(tokio_reactor_trait::Tokio);

    if config.tls.enabled {
        let mut uri: lapin::uri::AMQPUri = config
            .uri
            .parse()
            .map_err(|_| BrokerError::ConnectionClosed)?;
        uri.scheme = lapin::uri::AMQPScheme::AMQPS;
        if let Some(server_name) = &config.tls.server_name {
            uri.authority.host = server_name.clone();
        }
        return Connection::connect_uri(uri, properties)
            .await
            .map_err(BrokerError::ConnectionFailed);
    }

    Connection::connect(&config.uri, properties)
        .await
        .map_err(BrokerError::ConnectionFailed)
}

/// Polls connection health and runs the reconnect loop on loss or on
/// idle-stale detection. One watchdog task per `RobustConnection`, for
/// its whole lifetime.
async fn watchdog(conn: Arc<RobustConnection>) {
    let mut poll = tokio::time::interval(Duration::from_secs(1));
    loop {
        poll.tick().await;
        if conn.should_stop.load(Ordering::SeqCst) {
            return;
        }
        let connected = conn.is_connected();
        let stale = conn.take_stale();
        if !should_begin_reconnect(connected, stale) {
            continue;
        }
        if stale {
            warn!("broker connection is idle-stale, beginning reconnect loop");
        } else {
            warn!("broker connection lost, beginning reconnect loop");
        }
        let _ = conn.state_tx.send(ConnectionState::Reconnecting);
        if reconnect_loop(&conn).await.is_err() {
            return;
        }
        info!("broker connection restored");
        let _ = conn.state_tx.send(ConnectionState::Connected);
    }
}

/// Whether the watchdog should enter the reconnect loop this tick.
/// Either the connection reports closed outright, or `channel()`
/// flagged it idle-stale since the last poll — `status().connected()`
/// alone never observes the latter.
fn should_begin_reconnect(connected: bool, stale: bool) -> bool {
    !connected || stale
}

/// Full jitter: a uniform random delay between zero and the computed
/// backoff, so a fleet of workers that all lost the broker at once
/// don't all retry in lockstep.
fn jittered_delay(delay: Duration) -> Duration {
    let factor: f64 = rand::random::<f64>();
    delay.mul_f64(factor)
}

async fn reconnect_loop(conn: &RobustConnection) -> Result<(), BrokerError> {
    let mut delay = conn.config.initial_reconnect_delay;
    let mut attempt: u32 = 0;
    loop {
        if conn.should_stop.load(Ordering::SeqCst) {
            return Err(BrokerError::ConnectionClosed);
        }
        if let Some(max) = conn.config.max_reconnect_attempts {
            if attempt >= max {
                return Err(BrokerError::ReconnectExhausted(max));
            }
        }
        attempt += 1;
        match dial(&conn.config).await {
            Ok(fresh) => {
                conn.replace_connection(fresh).await;
                return Ok(());
            }
            Err(err) => {
                let jittered = jittered_delay(delay);
                warn!(attempt, error = %err, delay_ms = jittered.as_millis(), "reconnect attempt failed, backing off");
                tokio::time::sleep(jittered).await;
                let scaled = delay.mul_f64(conn.config.backoff_multiplier);
                delay = scaled.min(conn.config.max_reconnect_delay);
            }
        }
    }
}
