// ABOUTME: Health probe bookkeeping for the live store connection
// ABOUTME: Counts probe timeouts so an unresponsive server is treated like a lost connection

use std::time::Duration;
use tracing::{debug, warn};

/// Health probe settings, taken from the connection configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Interval between probes on a live connection
    pub interval: Duration,

    /// Maximum time to wait for a probe to complete
    ///
    /// Capped to the interval so that a stuck probe never overlaps the next tick.
    pub timeout: Duration,

    /// Consecutive timeouts before the connection is considered lost
    pub max_misses: u32,
}

impl HealthConfig {
    pub fn new(interval: Duration, max_misses: u32) -> Self {
        Self {
            interval,
            timeout: interval.min(Duration::from_secs(10)),
            max_misses,
        }
    }
}

/// Statistics about the probes run on the current connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthStatus {
    /// Probes that timed out in a row; reset by any answered probe
    pub consecutive_misses: u32,

    /// Probes started on this connection
    pub total_probes: u32,

    /// Probes that completed successfully
    pub total_answered: u32,
}

/// Tracks probe outcomes for one live connection
///
/// A fresh monitor is created every time a connection is established. The
/// supervisor drives it:
///
/// 1. on each tick, call `on_probe_sent()` and ping the connection
/// 2. report `on_probe_answered()` or `on_probe_timeout()`
/// 3. once `is_connection_failed()` is true, treat the connection as lost
///
/// Probes that fail with an error (rather than timing out) are classified
/// directly by the supervisor and never reach the monitor.
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthConfig,
    status: HealthStatus,
}

impl HealthMonitor {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            status: HealthStatus::default(),
        }
    }

    pub fn on_probe_sent(&mut self) {
        self.status.total_probes += 1;
        debug!("Health probe sent (total: {})", self.status.total_probes);
    }

    pub fn on_probe_answered(&mut self) {
        self.status.consecutive_misses = 0;
        self.status.total_answered += 1;
    }

    pub fn on_probe_timeout(&mut self) {
        self.status.consecutive_misses += 1;
        warn!(
            "Health probe timed out (consecutive misses: {})",
            self.status.consecutive_misses
        );
    }

    /// True once `max_misses` probes in a row went unanswered
    pub fn is_connection_failed(&self) -> bool {
        self.status.consecutive_misses >= self.config.max_misses
    }

    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}
