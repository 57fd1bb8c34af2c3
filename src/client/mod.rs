// ABOUTME: Adapter module exposing message operations, configuration, errors and store traits
// ABOUTME: Re-exports the public client surface used by hosts of the SMS daemon bridge

//! SMS daemon client
//!
//! This module provides the query adapter hosts use to exchange messages with
//! field devices through the SMS daemon's database:
//!
//! * **Five operations** - `get_from`, `get_all`, `del_by_id`, `check_by_id`, `send_to`
//! * **Self-healing connection** - a background supervisor reconnects after a fixed delay
//! * **Trait seams** - `StoreBackend`/`StoreConnection` for the database, `LogSink` for logs
//! * **Daemon-compatible encoding** - outgoing text is written as hex UCS-2
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smsd_bridge::client::{AdapterBuilder, GatewayConnectionConfig, SmsCommand};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConnectionConfig::new("localhost", "smsd", "smsd", "secret")
//!     .with_report(true);
//! let adapter = AdapterBuilder::new(config).mysql()?;
//!
//! // Queue a command for a device
//! let queued = adapter.send_to(&SmsCommand::new("612345678", "GPS?")).await?;
//!
//! // Has the daemon picked it up yet?
//! let pending = adapter.check_by_id(queued.id).await?;
//!
//! // Harvest replies from that device, then clear them
//! for reply in adapter.get_from("+612345678", None).await? {
//!     println!("{}: {}", reply.receiving_date_time, reply.text_decoded);
//!     adapter.del_by_id(reply.id).await?;
//! }
//! # let _ = pending;
//! # Ok(())
//! # }
//! ```
//!
//! ## Watching the connection
//!
//! ```rust,no_run
//! use smsd_bridge::client::{AdapterBuilder, GatewayConnectionConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConnectionConfig::new("localhost", "smsd", "smsd", "secret");
//! let adapter = AdapterBuilder::new(config).mysql()?;
//! let mut events = adapter.manager().subscribe();
//!
//! tokio::select! {
//!     fatal = adapter.manager().fatal() => return Err(fatal.into()),
//!     Ok(event) = events.recv() => println!("{:?} -> {:?}", event.from, event.to),
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod builder;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod traits;
pub mod types;

pub use adapter::QueryAdapter;
pub use builder::AdapterBuilder;
pub use config::GatewayConnectionConfig;
pub use error::{
    ConfigError, EncodingError, ErrorClass, GatewayError, GatewayResult, StoreError, StoreResult,
};
pub use keepalive::{HealthConfig, HealthMonitor, HealthStatus};
pub use traits::{LogSink, StoreBackend, StoreConnection, TracingSink};
pub use types::{
    ConnectionEvent, ConnectionState, ConnectionStatus, InboxRecord, InsertResult, OutboxRecord,
    SmsCommand, Verbosity,
};
