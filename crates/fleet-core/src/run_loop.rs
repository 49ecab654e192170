use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

/// The four hooks a subject (Worker or Server) plugs into the shared
/// run loop. Mirrors the lifecycle every subject goes through: heartbeat,
/// do-work, drain-and-handle-commands, and a stop check evaluated once
/// per tick.
#[async_trait]
pub trait RunLoopHooks: Send + Sync {
    async fn send_heartbeat(&self);
    async fn do_work(&self);
    async fn handle_commands(&self);
    fn should_stop(&self) -> bool;
}

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const LIVENESS_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Runs `hooks` until `should_stop()` returns true, calling
/// `send_heartbeat` every `heartbeat_interval` and `do_work` /
/// `handle_commands` on every tick. Logs a liveness line every 30s.
///
/// Does not publish CREATED/INITIALIZING/RUNNING/COMPLETE itself — those
/// are subject-specific (worker vs. server identifiers and entity types)
/// and are published by the caller around this loop.
pub async fn run_loop(hooks: &dyn RunLoopHooks, heartbeat_interval: Duration) {
    let mut last_heartbeat = Instant::now() - heartbeat_interval;
    let mut last_liveness_log = Instant::now();

    while !hooks.should_stop() {
        let tick_start = Instant::now();

        if tick_start.duration_since(last_liveness_log) >= LIVENESS_LOG_INTERVAL {
            tracing::info!("run loop still active");
            last_liveness_log = tick_start;
        }

        if tick_start.duration_since(last_heartbeat) >= heartbeat_interval {
            hooks.send_heartbeat().await;
            last_heartbeat = tick_start;
        }

        hooks.do_work().await;
        hooks.handle_commands().await;

        let elapsed = tick_start.elapsed();
        if elapsed < TICK_INTERVAL {
            tokio::time::sleep(TICK_INTERVAL - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHooks {
        heartbeats: Arc<AtomicUsize>,
        ticks: Arc<AtomicUsize>,
        stop_after: usize,
    }

    #[async_trait]
    impl RunLoopHooks for CountingHooks {
        async fn send_heartbeat(&self) {
            self.heartbeats.fetch_add(1, Ordering::SeqCst);
        }

        async fn do_work(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        async fn handle_commands(&self) {}

        fn should_stop(&self) -> bool {
            self.ticks.load(Ordering::SeqCst) >= self.stop_after
        }
    }

    #[tokio::test]
    async fn stops_once_should_stop_reports_true() {
        let hooks = CountingHooks {
            heartbeats: Arc::new(AtomicUsize::new(0)),
            ticks: Arc::new(AtomicUsize::new(0)),
            stop_after: 3,
        };
        run_loop(&hooks, Duration::from_millis(1)).await;
        assert!(hooks.ticks.load(Ordering::SeqCst) >= 3);
    }
}
