// ABOUTME: Query adapter exposing the five inbox/outbox operations on top of the connection manager
// ABOUTME: Normalizes and encodes send requests, logs query text and forwards store errors verbatim

use crate::client::config::GatewayConnectionConfig;
use crate::client::error::{GatewayError, GatewayResult, StoreError, StoreResult};
use crate::client::traits::{StoreBackend, StoreConnection};
use crate::client::types::{
    DEFAULT_RELATIVE_VALIDITY, FALLBACK_CREATOR_ID, InboxRecord, InsertResult, OutboxRecord,
    SmsCommand, UNKNOWN_CLASS, Verbosity,
};
use crate::codec;
use crate::connection::{ConnectionManager, Live};
use crate::phone;
use crate::store::statement::Statement;
use chrono::Local;
use tracing::Level;

/// Message operations against the daemon's `inbox` and `outbox` tables
///
/// Every operation runs on the manager's current live connection. Nothing is
/// retried or queued here: if the manager is reconnecting, the call fails
/// with `GatewayError::Query(StoreError::NotConnected)`, and store failures
/// are returned to the caller unchanged. Failures that show the connection
/// itself is gone are also handed to the manager so it can reconnect.
pub struct QueryAdapter<B: StoreBackend> {
    manager: ConnectionManager<B>,
}

impl<B: StoreBackend> QueryAdapter<B> {
    pub fn new(manager: ConnectionManager<B>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConnectionManager<B> {
        &self.manager
    }

    pub fn config(&self) -> &GatewayConnectionConfig {
        self.manager.config()
    }

    /// Messages received from `phone`, oldest first
    ///
    /// `limit` defaults to the configured row limit.
    pub async fn get_from(&self, phone: &str, limit: Option<u32>) -> GatewayResult<Vec<InboxRecord>> {
        let limit = limit.unwrap_or(self.config().limit);
        let statement = Statement::InboxFrom {
            sender: phone,
            limit,
        };
        let live = self.begin(&statement)?;
        let result = live.conn.fetch_inbox(Some(phone), limit).await;
        self.finish(&statement, live.generation, result, |rows| {
            format!("{} rows", rows.len())
        })
    }

    /// All received messages, oldest first
    pub async fn get_all(&self, limit: Option<u32>) -> GatewayResult<Vec<InboxRecord>> {
        let limit = limit.unwrap_or(self.config().limit);
        let statement = Statement::InboxAll { limit };
        let live = self.begin(&statement)?;
        let result = live.conn.fetch_inbox(None, limit).await;
        self.finish(&statement, live.generation, result, |rows| {
            format!("{} rows", rows.len())
        })
    }

    /// Delete an inbox row; returns 0 when no such row exists
    pub async fn del_by_id(&self, id: u64) -> GatewayResult<u64> {
        let statement = Statement::DeleteInbox { id };
        let live = self.begin(&statement)?;
        let result = live.conn.delete_inbox(id).await;
        self.finish(&statement, live.generation, result, |affected| {
            format!("{affected} rows affected")
        })
    }

    /// Whether the outbox still holds the row, i.e. the daemon has not sent it yet
    pub async fn check_by_id(&self, id: u64) -> GatewayResult<bool> {
        let statement = Statement::OutboxExists { id };
        let live = self.begin(&statement)?;
        let result = live.conn.outbox_exists(id).await;
        self.finish(&statement, live.generation, result, |exists| {
            format!("exists: {exists}")
        })
    }

    /// Queue a message for the daemon
    ///
    /// Encoding failures are reported before the store is touched.
    pub async fn send_to(&self, command: &SmsCommand) -> GatewayResult<InsertResult> {
        let record = self.build_outbox(command)?;
        let statement = Statement::InsertOutbox(&record);
        let live = self.begin(&statement)?;
        let result = live.conn.insert_outbox(&record).await;
        self.finish(&statement, live.generation, result, |inserted| {
            format!("inserted ID {}", inserted.id)
        })
    }

    /// Outbox row that [`send_to`](Self::send_to) inserts for `command`
    pub fn build_outbox(&self, command: &SmsCommand) -> GatewayResult<OutboxRecord> {
        let destination = phone::normalize(&command.phone);
        let text = codec::encode(&command.msg)?;
        let creator_id = if command.phone.trim().is_empty() {
            FALLBACK_CREATOR_ID.to_string()
        } else {
            destination.clone()
        };

        Ok(OutboxRecord {
            destination_number: destination,
            multi_part: false,
            relative_validity: DEFAULT_RELATIVE_VALIDITY,
            text,
            udh: String::new(),
            class: UNKNOWN_CLASS,
            insert_into_db: Local::now().naive_local(),
            text_decoded: command.msg.clone(),
            delivery_report: self.config().report,
            creator_id,
        })
    }

    fn logs_queries(&self) -> bool {
        self.manager.verbosity() >= Verbosity::Queries
    }

    fn begin(&self, statement: &Statement<'_>) -> GatewayResult<Live<B::Connection>> {
        if self.logs_queries() {
            self.manager
                .log(Level::DEBUG, &format!("query: {}", statement.render()));
        }
        self.manager.live().map_err(|error| {
            if self.logs_queries() {
                self.manager.log(
                    Level::DEBUG,
                    &format!("query failed: {}: {error}", statement.render()),
                );
            }
            GatewayError::Query(error)
        })
    }

    fn finish<T>(
        &self,
        statement: &Statement<'_>,
        generation: u64,
        result: StoreResult<T>,
        describe: impl FnOnce(&T) -> String,
    ) -> GatewayResult<T> {
        match result {
            Ok(value) => {
                if self.logs_queries() {
                    self.manager.log(
                        Level::DEBUG,
                        &format!("query done: {}: {}", statement.render(), describe(&value)),
                    );
                }
                Ok(value)
            }
            Err(error) => {
                if self.logs_queries() {
                    self.manager.log(
                        Level::DEBUG,
                        &format!("query failed: {}: {error}", statement.render()),
                    );
                }
                if error.is_connection_lost() {
                    let reason = match &error {
                        StoreError::ConnectionLost(reason) => reason.clone(),
                        other => other.to_string(),
                    };
                    self.manager
                        .report(generation, StoreError::ConnectionLost(reason));
                }
                Err(GatewayError::Query(error))
            }
        }
    }
}
