// ABOUTME: Value types exchanged with the SMS daemon tables and the connection state machine
// ABOUTME: Inbox/outbox rows, send commands, insert results and connection state snapshots

use chrono::NaiveDateTime;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Validity period the daemon treats as "maximum"
pub const DEFAULT_RELATIVE_VALIDITY: i32 = 255;

/// Message class meaning "unspecified"
pub const UNKNOWN_CLASS: i32 = -1;

/// CreatorID written when the command carries no phone number
pub const FALLBACK_CREATOR_ID: &str = "smsd-bridge";

/// A received message, one row of `inbox`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxRecord {
    pub id: u64,
    pub receiving_date_time: NaiveDateTime,
    pub smsc_number: String,
    pub sender_number: String,
    pub text_decoded: String,
}

/// A message queued for the daemon, one row of `outbox`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub destination_number: String,
    pub multi_part: bool,
    pub relative_validity: i32,
    /// Hex UCS-2, see [`crate::codec::encode`]
    pub text: String,
    pub udh: String,
    pub class: i32,
    pub insert_into_db: NaiveDateTime,
    pub text_decoded: String,
    pub delivery_report: bool,
    pub creator_id: String,
}

/// Caller-supplied send request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsCommand {
    pub phone: String,
    pub msg: String,
}

impl SmsCommand {
    pub fn new(phone: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            msg: msg.into(),
        }
    }
}

/// Outcome of an outbox insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertResult {
    /// Auto-increment `ID` assigned to the new row
    pub id: u64,
    pub affected_rows: u64,
}

/// State of the single logical store connection
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...
///                     \____________failure____/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Nothing attempted yet
    Disconnected,
    /// A connect attempt is in progress
    Connecting,
    /// A live connection is held
    Connected,
    /// Waiting out the reconnect delay
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// A state transition, broadcast to subscribers of the connection manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Snapshot of the connection manager for status displays
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    /// Stable identifier of the logical connection
    pub uid: String,
    pub state: ConnectionState,
    /// Connect attempts started since initialization
    pub connect_attempts: u32,
    /// Reconnect timers scheduled since initialization
    pub reconnects_scheduled: u32,
    /// Last failure seen by the manager, if any
    pub last_error: Option<String>,
}

/// Logging verbosity selected by the `debug` setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Verbosity {
    /// State transitions logged at DEBUG, no query text
    Quiet = 0,
    /// State transitions promoted to INFO
    Transitions = 1,
    /// Transitions plus rendered query text before and after every query
    Queries = 2,
}

impl Verbosity {
    /// Map a raw debug level, saturating at [`Verbosity::Queries`]
    pub fn from_level(level: u8) -> Self {
        Verbosity::try_from(level).unwrap_or(Verbosity::Queries)
    }
}
