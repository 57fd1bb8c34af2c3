pub mod client;
pub mod codec;
pub mod connection;
pub mod phone;
pub mod store;

#[cfg(test)]
mod tests;

// Re-export the main client API for easy access
pub use client::{
    AdapterBuilder, ConnectionState, GatewayConnectionConfig, GatewayError, GatewayResult,
    InboxRecord, InsertResult, OutboxRecord, QueryAdapter, SmsCommand, StoreError,
};
pub use connection::{ConnectionManager, FatalError};

/// A specialized `Result` type for bridge operations.
///
/// # Examples
///
/// ## Sending a command and reading replies
///
/// ```rust,no_run
/// use smsd_bridge::{AdapterBuilder, GatewayConnectionConfig, SmsCommand};
///
/// #[tokio::main]
/// async fn main() -> smsd_bridge::Result<()> {
///     let config = GatewayConnectionConfig::new("localhost", "smsd", "smsd", "secret");
///     let adapter = AdapterBuilder::new(config).mysql()?;
///
///     // Wait for the first connection before issuing queries
///     let mut state = adapter.manager().watch_state();
///     let _ = state
///         .wait_for(|s| *s == smsd_bridge::ConnectionState::Connected)
///         .await;
///
///     let queued = adapter.send_to(&SmsCommand::new("612345678", "Hello")).await?;
///     println!("Queued as outbox row {}", queued.id);
///
///     for message in adapter.get_all(None).await? {
///         println!("{} says {}", message.sender_number, message.text_decoded);
///     }
///
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, GatewayError>;
