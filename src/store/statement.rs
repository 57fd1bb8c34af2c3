//! Statements issued against the daemon's tables.
//!
//! Table and column names match the SMS daemon schema verbatim. Each
//! [`Statement`] knows its parameterized SQL, its bound values and how to
//! render itself with the values inlined for query logging.

use crate::client::types::OutboxRecord;
use chrono::NaiveDateTime;

pub const SELECT_INBOX_FROM: &str = "SELECT ID, ReceivingDateTime, SMSCNumber, SenderNumber, TextDecoded \
     FROM inbox WHERE SenderNumber = ? ORDER BY ID ASC LIMIT ?";

pub const SELECT_INBOX_ALL: &str = "SELECT ID, ReceivingDateTime, SMSCNumber, SenderNumber, TextDecoded \
     FROM inbox ORDER BY ID ASC LIMIT ?";

pub const DELETE_INBOX: &str = "DELETE FROM inbox WHERE ID = ?";

pub const SELECT_OUTBOX_ID: &str = "SELECT ID FROM outbox WHERE ID = ?";

pub const INSERT_OUTBOX: &str = "INSERT INTO outbox \
     (DestinationNumber, MultiPart, RelativeValidity, Text, UDH, Class, InsertIntoDB, TextDecoded, DeliveryReport, CreatorID) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Timestamp(NaiveDateTime),
}

impl SqlValue {
    fn render(&self) -> String {
        match self {
            SqlValue::Text(v) => format!("'{}'", v.replace('\\', "\\\\").replace('\'', "''")),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::UInt(v) => v.to_string(),
            SqlValue::Timestamp(v) => format!("'{}'", v.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// One of the five statements the adapter issues
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    InboxFrom { sender: &'a str, limit: u32 },
    InboxAll { limit: u32 },
    DeleteInbox { id: u64 },
    OutboxExists { id: u64 },
    InsertOutbox(&'a OutboxRecord),
}

impl Statement<'_> {
    /// Parameterized SQL text
    pub fn sql(&self) -> &'static str {
        match self {
            Statement::InboxFrom { .. } => SELECT_INBOX_FROM,
            Statement::InboxAll { .. } => SELECT_INBOX_ALL,
            Statement::DeleteInbox { .. } => DELETE_INBOX,
            Statement::OutboxExists { .. } => SELECT_OUTBOX_ID,
            Statement::InsertOutbox(_) => INSERT_OUTBOX,
        }
    }

    /// Values for the placeholders, in order
    pub fn params(&self) -> Vec<SqlValue> {
        match self {
            Statement::InboxFrom { sender, limit } => vec![
                SqlValue::Text(sender.to_string()),
                SqlValue::UInt(u64::from(*limit)),
            ],
            Statement::InboxAll { limit } => vec![SqlValue::UInt(u64::from(*limit))],
            Statement::DeleteInbox { id } | Statement::OutboxExists { id } => {
                vec![SqlValue::UInt(*id)]
            }
            Statement::InsertOutbox(record) => vec![
                SqlValue::Text(record.destination_number.clone()),
                // MultiPart and DeliveryReport are enum columns in the daemon schema
                SqlValue::Text(if record.multi_part { "true" } else { "false" }.to_string()),
                SqlValue::Int(i64::from(record.relative_validity)),
                SqlValue::Text(record.text.clone()),
                SqlValue::Text(record.udh.clone()),
                SqlValue::Int(i64::from(record.class)),
                SqlValue::Timestamp(record.insert_into_db),
                SqlValue::Text(record.text_decoded.clone()),
                SqlValue::Text(if record.delivery_report { "yes" } else { "no" }.to_string()),
                SqlValue::Text(record.creator_id.clone()),
            ],
        }
    }

    /// SQL with every placeholder replaced by its quoted value
    pub fn render(&self) -> String {
        let sql = self.sql();
        let mut params = self.params().into_iter();
        let mut out = String::with_capacity(sql.len() + 32);
        for ch in sql.chars() {
            match ch {
                '?' => match params.next() {
                    Some(value) => out.push_str(&value.render()),
                    None => out.push('?'),
                },
                other => out.push(other),
            }
        }
        out
    }
}
