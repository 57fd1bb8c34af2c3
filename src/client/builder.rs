// ABOUTME: Factory for query adapters wiring configuration, log sink and store backend together
// ABOUTME: Starts the connection manager and returns immediately; connecting happens in the background

use crate::client::adapter::QueryAdapter;
use crate::client::config::GatewayConnectionConfig;
use crate::client::error::GatewayResult;
use crate::client::traits::{LogSink, StoreBackend, TracingSink};
use crate::connection::ConnectionManager;
use crate::store::MySqlBackend;
use std::sync::Arc;

/// Builds a [`QueryAdapter`] and starts its connection manager
///
/// ```rust,no_run
/// use smsd_bridge::client::{AdapterBuilder, GatewayConnectionConfig, SmsCommand};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GatewayConnectionConfig::new("localhost", "smsd", "smsd", "secret");
/// let adapter = AdapterBuilder::new(config).mysql()?;
///
/// let result = adapter.send_to(&SmsCommand::new("612345678", "STATUS")).await?;
/// println!("queued as outbox row {}", result.id);
/// # Ok(())
/// # }
/// ```
pub struct AdapterBuilder {
    config: GatewayConnectionConfig,
    log: Arc<dyn LogSink>,
}

impl AdapterBuilder {
    /// Start from a configuration, logging through `tracing`
    pub fn new(config: GatewayConnectionConfig) -> Self {
        Self {
            config,
            log: Arc::new(TracingSink),
        }
    }

    /// Replace the log sink
    pub fn log_sink(mut self, log: Arc<dyn LogSink>) -> Self {
        self.log = log;
        self
    }

    /// Start managing a connection through `backend`
    ///
    /// Fails only on invalid configuration. Must be called from within a
    /// Tokio runtime.
    pub fn connect<B: StoreBackend>(self, backend: B) -> GatewayResult<QueryAdapter<B>> {
        let manager = ConnectionManager::initialize(self.config, backend, self.log)?;
        Ok(QueryAdapter::new(manager))
    }

    /// Start managing a MySQL connection
    pub fn mysql(self) -> GatewayResult<QueryAdapter<MySqlBackend>> {
        self.connect(MySqlBackend)
    }
}
