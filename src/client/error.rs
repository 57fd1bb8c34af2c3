// ABOUTME: Error types for the store adapter covering connectivity, query, encoding and fatal failures
// ABOUTME: Classifies backend failures so the connection manager can decide between reconnecting and giving up

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// How the connection manager should react to a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The connection to the store was lost or reset; reconnecting is safe
    ConnectionLost,
    /// The statement itself failed (schema, data, constraint); the connection is fine
    Query,
    /// No recovery policy exists for this failure
    Unclassified,
}

/// Failure reported by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// No live connection is held; the manager is connecting or reconnecting
    #[error("not connected to {0}")]
    NotConnected(String),

    /// The connection was dropped by the peer or the server restarted
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The store rejected the statement
    #[error("query rejected: {0}")]
    Rejected(String),

    /// Failure outside every known category
    #[error("unexpected store failure: {0}")]
    Unexpected(String),

    /// Error raised by the MySQL driver
    #[error("mysql: {0}")]
    MySql(#[from] sqlx::Error),
}

impl StoreError {
    /// Classify this failure for the reconnection policy
    pub fn class(&self) -> ErrorClass {
        match self {
            StoreError::NotConnected(_) | StoreError::ConnectionLost(_) => {
                ErrorClass::ConnectionLost
            }
            StoreError::Rejected(_) => ErrorClass::Query,
            StoreError::Unexpected(_) => ErrorClass::Unclassified,
            StoreError::MySql(err) => classify_mysql(err),
        }
    }

    /// True when the failure means the connection itself is gone
    pub fn is_connection_lost(&self) -> bool {
        self.class() == ErrorClass::ConnectionLost
    }
}

/// MySQL server error numbers that mean the session is gone
///
/// 1053 server shutdown in progress, 1927 connection killed,
/// 2006 server has gone away, 2013 lost connection during query.
const MYSQL_CONNECTION_LOST: [u16; 4] = [1053, 1927, 2006, 2013];

fn classify_mysql(err: &sqlx::Error) -> ErrorClass {
    match err {
        sqlx::Error::Io(io_err) => match io_err.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected
            | io::ErrorKind::TimedOut => ErrorClass::ConnectionLost,
            _ => ErrorClass::Unclassified,
        },
        sqlx::Error::Database(db_err) => {
            match db_err
                .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                .map(|e| e.number())
            {
                Some(number) if MYSQL_CONNECTION_LOST.contains(&number) => {
                    ErrorClass::ConnectionLost
                }
                _ => ErrorClass::Query,
            }
        }
        sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => ErrorClass::ConnectionLost,
        sqlx::Error::Protocol(_) | sqlx::Error::Tls(_) => ErrorClass::Unclassified,
        _ => ErrorClass::Query,
    }
}

/// Malformed input to the message codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The UCS-2 byte buffer does not hold whole code units
    #[error("odd byte count {0} in UCS-2 buffer")]
    OddLength(usize),

    /// A character outside `[0-9a-fA-F]` was found in hex input
    #[error("invalid hex digit {digit:?} at offset {offset}")]
    InvalidHex { digit: char, offset: usize },

    /// The decoded code units are not valid UTF-16
    #[error("invalid UTF-16 sequence")]
    InvalidUtf16,
}

/// Configuration rejected at construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required field was empty
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A numeric field was out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Error returned to callers of the query adapter
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Store-level failure, forwarded verbatim and never retried
    #[error("query failed: {0}")]
    Query(#[source] StoreError),

    /// Message text could not be encoded
    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Unclassified runtime failure; the connection manager has stopped
    #[error("fatal store error on {uid}: {source}")]
    Fatal {
        uid: String,
        #[source]
        source: Arc<StoreError>,
    },
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        GatewayError::Query(err)
    }
}

/// Result type alias for adapter operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type alias for backend operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_classes() {
        assert_eq!(
            StoreError::ConnectionLost("reset".into()).class(),
            ErrorClass::ConnectionLost
        );
        assert_eq!(
            StoreError::NotConnected("mysql://u@h/db".into()).class(),
            ErrorClass::ConnectionLost
        );
        assert_eq!(StoreError::Rejected("syntax".into()).class(), ErrorClass::Query);
        assert_eq!(
            StoreError::Unexpected("corrupt".into()).class(),
            ErrorClass::Unclassified
        );
    }

    #[test]
    fn test_mysql_io_errors_are_connection_lost() {
        let err = StoreError::from(sqlx::Error::Io(io::Error::from(
            io::ErrorKind::ConnectionReset,
        )));
        assert!(err.is_connection_lost());

        let err = StoreError::from(sqlx::Error::Io(io::Error::from(
            io::ErrorKind::PermissionDenied,
        )));
        assert_eq!(err.class(), ErrorClass::Unclassified);
    }

    #[test]
    fn test_mysql_misc_errors() {
        assert!(StoreError::from(sqlx::Error::PoolClosed).is_connection_lost());
        assert_eq!(
            StoreError::from(sqlx::Error::RowNotFound).class(),
            ErrorClass::Query
        );
        assert_eq!(
            StoreError::from(sqlx::Error::Protocol("bad packet".into())).class(),
            ErrorClass::Unclassified
        );
    }

    #[test]
    fn test_store_error_converts_to_query_error() {
        let err: GatewayError = StoreError::Rejected("duplicate".into()).into();
        assert!(matches!(err, GatewayError::Query(StoreError::Rejected(_))));
        assert_eq!(err.to_string(), "query failed: query rejected: duplicate");
    }
}
