// ABOUTME: In-memory store backend mirroring the daemon's inbox/outbox tables
// ABOUTME: Supports scripted connect failures, dropped sessions and fatal faults for exercising the reconnect loop

use crate::client::config::GatewayConnectionConfig;
use crate::client::error::{StoreError, StoreResult};
use crate::client::traits::{StoreBackend, StoreConnection};
use crate::client::types::{InboxRecord, InsertResult, OutboxRecord};
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    inbox: BTreeMap<u64, InboxRecord>,
    outbox: BTreeMap<u64, OutboxRecord>,
    next_inbox_id: u64,
    next_outbox_id: u64,
    /// Bumped by `drop_connections`; sessions from older epochs are dead
    epoch: u64,
    refuse_connects: u32,
    connect_attempts: u32,
    fatal: Option<String>,
    reject_next: Option<String>,
    stall_pings: bool,
}

/// Shared in-memory database; clones see the same tables
///
/// # Example
///
/// ```rust
/// use smsd_bridge::store::MemoryBackend;
///
/// let backend = MemoryBackend::new();
/// backend.refuse_connects(1);
/// let id = backend.push_inbox("+33612345678", "position ok");
/// assert_eq!(backend.inbox().len(), 1);
/// assert_eq!(backend.inbox()[0].id, id);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a received message and return its id
    pub fn push_inbox(&self, sender: &str, text: &str) -> u64 {
        self.push_inbox_at(sender, text, Local::now().naive_local())
    }

    pub fn push_inbox_at(&self, sender: &str, text: &str, received: NaiveDateTime) -> u64 {
        let mut state = self.lock();
        state.next_inbox_id += 1;
        let id = state.next_inbox_id;
        state.inbox.insert(
            id,
            InboxRecord {
                id,
                receiving_date_time: received,
                smsc_number: "+33609001390".to_string(),
                sender_number: sender.to_string(),
                text_decoded: text.to_string(),
            },
        );
        id
    }

    /// Current inbox rows in id order
    pub fn inbox(&self) -> Vec<InboxRecord> {
        self.lock().inbox.values().cloned().collect()
    }

    /// Current outbox rows with their ids, in id order
    pub fn outbox(&self) -> Vec<(u64, OutboxRecord)> {
        self.lock()
            .outbox
            .iter()
            .map(|(id, record)| (*id, record.clone()))
            .collect()
    }

    /// Fail the next `count` connect attempts
    pub fn refuse_connects(&self, count: u32) {
        self.lock().refuse_connects = count;
    }

    /// Connect attempts seen so far, successful or not
    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    /// Kill every open session, as a server restart would
    pub fn drop_connections(&self) {
        self.lock().epoch += 1;
    }

    /// Make every ping fail with an unclassified error
    pub fn inject_fatal(&self, message: &str) {
        self.lock().fatal = Some(message.to_string());
    }

    /// Reject the next statement with a query-level error
    pub fn reject_next_query(&self, message: &str) {
        self.lock().reject_next = Some(message.to_string());
    }

    /// Make pings hang forever
    pub fn stall_pings(&self, stall: bool) {
        self.lock().stall_pings = stall;
    }
}

impl StoreBackend for MemoryBackend {
    type Connection = MemoryConnection;

    async fn connect(&self, config: &GatewayConnectionConfig) -> StoreResult<MemoryConnection> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.refuse_connects > 0 {
            state.refuse_connects -= 1;
            return Err(StoreError::ConnectionLost(format!(
                "connection refused by {}",
                config.uid()
            )));
        }
        Ok(MemoryConnection {
            backend: self.clone(),
            epoch: state.epoch,
        })
    }
}

/// One session on a [`MemoryBackend`]
#[derive(Debug)]
pub struct MemoryConnection {
    backend: MemoryBackend,
    epoch: u64,
}

impl MemoryConnection {
    /// Lock the tables, failing if this session was dropped or a query
    /// rejection is pending
    fn session(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.backend.lock();
        if state.epoch != self.epoch {
            return Err(StoreError::ConnectionLost(
                "server closed the connection".to_string(),
            ));
        }
        if let Some(message) = state.reject_next.take() {
            return Err(StoreError::Rejected(message));
        }
        Ok(state)
    }
}

impl StoreConnection for MemoryConnection {
    async fn ping(&self) -> StoreResult<()> {
        let stall = {
            let state = self.backend.lock();
            if state.epoch != self.epoch {
                return Err(StoreError::ConnectionLost(
                    "server closed the connection".to_string(),
                ));
            }
            if let Some(message) = &state.fatal {
                return Err(StoreError::Unexpected(message.clone()));
            }
            state.stall_pings
        };
        if stall {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn fetch_inbox(&self, sender: Option<&str>, limit: u32) -> StoreResult<Vec<InboxRecord>> {
        let state = self.session()?;
        Ok(state
            .inbox
            .values()
            .filter(|record| sender.is_none_or(|s| record.sender_number == s))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_inbox(&self, id: u64) -> StoreResult<u64> {
        let mut state = self.session()?;
        Ok(u64::from(state.inbox.remove(&id).is_some()))
    }

    async fn outbox_exists(&self, id: u64) -> StoreResult<bool> {
        let state = self.session()?;
        Ok(state.outbox.contains_key(&id))
    }

    async fn insert_outbox(&self, record: &OutboxRecord) -> StoreResult<InsertResult> {
        let mut state = self.session()?;
        state.next_outbox_id += 1;
        let id = state.next_outbox_id;
        state.outbox.insert(id, record.clone());
        Ok(InsertResult {
            id,
            affected_rows: 1,
        })
    }
}
