// ABOUTME: Trait seams between the adapter, the relational store and the host's log sink
// ABOUTME: Backends implement StoreBackend/StoreConnection with native async fns returning Send futures

use crate::client::config::GatewayConnectionConfig;
use crate::client::error::StoreResult;
use crate::client::types::{InboxRecord, InsertResult, OutboxRecord};
use std::future::Future;
use tracing::Level;

/// Factory for connections to the daemon's relational store
///
/// The connection manager calls `connect` once per attempt and owns the
/// resulting connection until it is lost.
pub trait StoreBackend: Send + Sync + 'static {
    /// Connection type produced by this backend
    type Connection: StoreConnection;

    /// Open one connection using the given configuration
    fn connect(
        &self,
        config: &GatewayConnectionConfig,
    ) -> impl Future<Output = StoreResult<Self::Connection>> + Send;
}

/// One live connection to the store
///
/// Every method maps to a single statement against the `inbox` or `outbox`
/// table. Implementations must not retry; failures are reported as-is and
/// classified through [`StoreError::class`](crate::client::StoreError::class).
pub trait StoreConnection: Send + Sync + 'static {
    /// Cheap round trip used by the health probe
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;

    /// Inbox rows in ascending `ID` order, optionally filtered on `SenderNumber`
    fn fetch_inbox(
        &self,
        sender: Option<&str>,
        limit: u32,
    ) -> impl Future<Output = StoreResult<Vec<InboxRecord>>> + Send;

    /// Delete one inbox row, returning the affected-row count
    fn delete_inbox(&self, id: u64) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Whether an outbox row with this `ID` exists
    fn outbox_exists(&self, id: u64) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Insert one outbox row
    fn insert_outbox(
        &self,
        record: &OutboxRecord,
    ) -> impl Future<Output = StoreResult<InsertResult>> + Send;
}

/// Leveled log capability supplied by the host
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// [`LogSink`] that forwards to `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!(target: "smsd_bridge", "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "smsd_bridge", "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "smsd_bridge", "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "smsd_bridge", "{message}");
        } else {
            tracing::trace!(target: "smsd_bridge", "{message}");
        }
    }
}
