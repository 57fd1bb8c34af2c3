// ABOUTME: Connection configuration for the SMS daemon store with builder-style setters
// ABOUTME: Carries credentials, row limit, report flag and the reconnect/health timing

use crate::client::error::ConfigError;
use crate::client::types::Verbosity;
use std::fmt;
use std::time::Duration;

/// Configuration for one logical connection to the daemon's database
///
/// Built once at startup and never mutated afterwards; the connection
/// manager keeps its own copy.
///
/// # Example
///
/// ```rust
/// use smsd_bridge::client::GatewayConnectionConfig;
/// use std::time::Duration;
///
/// let config = GatewayConnectionConfig::new("db.local", "smsd", "smsd", "secret")
///     .with_limit(50)
///     .with_report(true)
///     .with_delay(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.uid(), "mysql://smsd@db.local:3306/smsd");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConnectionConfig {
    /// Database host name or address
    pub hostname: String,

    /// Database port (default: 3306)
    pub port: u16,

    /// Database user
    pub username: String,

    /// Database (schema) name holding the `inbox` and `outbox` tables
    pub basename: String,

    /// Database password
    pub password: String,

    /// Debug level (default: 0); see [`Verbosity`]
    pub debug: u8,

    /// Request delivery reports for outgoing messages (default: false)
    pub report: bool,

    /// Default maximum number of rows returned by inbox queries (default: 10)
    pub limit: u32,

    /// Consecutive health probe timeouts tolerated before the connection is
    /// considered lost (default: 3)
    pub retry: u32,

    /// Fixed delay before a reconnect attempt (default: 10 seconds)
    ///
    /// There is no backoff: every failure waits exactly this long.
    pub delay: Duration,

    /// Interval between health probes on a live connection (default: 30 seconds)
    pub health_interval: Duration,
}

impl GatewayConnectionConfig {
    /// Create a configuration with the given credentials and default tuning
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        basename: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: 3306,
            username: username.into(),
            basename: basename.into(),
            password: password.into(),
            debug: 0,
            report: false,
            limit: 10,
            retry: 3,
            delay: Duration::from_secs(10),
            health_interval: Duration::from_secs(30),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_debug(mut self, debug: u8) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_report(mut self, report: bool) -> Self {
        self.report = report;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Check that the configuration can be used to connect
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Missing("hostname"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Missing("username"));
        }
        if self.basename.trim().is_empty() {
            return Err(ConfigError::Missing("basename"));
        }
        if self.limit == 0 {
            return Err(ConfigError::Invalid {
                field: "limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.retry == 0 {
            return Err(ConfigError::Invalid {
                field: "retry",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.delay.is_zero() {
            return Err(ConfigError::Invalid {
                field: "delay",
                reason: "reconnect delay must be non-zero".to_string(),
            });
        }
        if self.health_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "health_interval",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Stable identifier of the logical connection: scheme, user, host and database
    pub fn uid(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.username, self.hostname, self.port, self.basename
        )
    }

    /// Logging verbosity derived from `debug`
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_level(self.debug)
    }
}

// Keeps the password out of logs.
impl fmt::Debug for GatewayConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConnectionConfig")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("basename", &self.basename)
            .field("password", &"***")
            .field("debug", &self.debug)
            .field("report", &self.report)
            .field("limit", &self.limit)
            .field("retry", &self.retry)
            .field("delay", &self.delay)
            .field("health_interval", &self.health_interval)
            .finish()
    }
}
