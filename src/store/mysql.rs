// ABOUTME: MySQL store backend for the SMS daemon schema built on a single sqlx connection
// ABOUTME: Binds Statement parameters and maps result rows onto inbox records

use crate::client::config::GatewayConnectionConfig;
use crate::client::error::StoreResult;
use crate::client::traits::{StoreBackend, StoreConnection};
use crate::client::types::{InboxRecord, InsertResult, OutboxRecord};
use crate::store::statement::{SqlValue, Statement};
use sqlx::mysql::{MySql, MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

/// Opens connections to a MySQL/MariaDB server holding the daemon tables
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlBackend;

impl StoreBackend for MySqlBackend {
    type Connection = MySqlStore;

    async fn connect(&self, config: &GatewayConnectionConfig) -> StoreResult<MySqlStore> {
        let options = MySqlConnectOptions::new()
            .host(&config.hostname)
            .port(config.port)
            .username(&config.username)
            .password(&config.password)
            .database(&config.basename);

        debug!("Opening MySQL connection to {}", config.uid());
        let connection = MySqlConnection::connect_with(&options).await?;

        Ok(MySqlStore {
            connection: Mutex::new(connection),
        })
    }
}

/// One MySQL session
///
/// Statements are issued one at a time on the underlying session, in the
/// order callers acquire it.
pub struct MySqlStore {
    connection: Mutex<MySqlConnection>,
}

impl StoreConnection for MySqlStore {
    async fn ping(&self) -> StoreResult<()> {
        let mut connection = self.connection.lock().await;
        connection.ping().await?;
        Ok(())
    }

    async fn fetch_inbox(&self, sender: Option<&str>, limit: u32) -> StoreResult<Vec<InboxRecord>> {
        let statement = match sender {
            Some(sender) => Statement::InboxFrom { sender, limit },
            None => Statement::InboxAll { limit },
        };

        let mut connection = self.connection.lock().await;
        let rows = bind(&statement).fetch_all(&mut *connection).await?;
        rows.iter().map(inbox_from_row).collect()
    }

    async fn delete_inbox(&self, id: u64) -> StoreResult<u64> {
        let statement = Statement::DeleteInbox { id };
        let mut connection = self.connection.lock().await;
        let result = bind(&statement).execute(&mut *connection).await?;
        Ok(result.rows_affected())
    }

    async fn outbox_exists(&self, id: u64) -> StoreResult<bool> {
        let statement = Statement::OutboxExists { id };
        let mut connection = self.connection.lock().await;
        let row = bind(&statement).fetch_optional(&mut *connection).await?;
        Ok(row.is_some())
    }

    async fn insert_outbox(&self, record: &OutboxRecord) -> StoreResult<InsertResult> {
        let statement = Statement::InsertOutbox(record);
        let mut connection = self.connection.lock().await;
        let result = bind(&statement).execute(&mut *connection).await?;
        Ok(InsertResult {
            id: result.last_insert_id(),
            affected_rows: result.rows_affected(),
        })
    }
}

fn bind(statement: &Statement<'_>) -> Query<'static, MySql, MySqlArguments> {
    let mut query = sqlx::query(statement.sql());
    for value in statement.params() {
        query = match value {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::UInt(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
        };
    }
    query
}

fn inbox_from_row(row: &MySqlRow) -> StoreResult<InboxRecord> {
    Ok(InboxRecord {
        id: row.try_get(0)?,
        receiving_date_time: row.try_get(1)?,
        smsc_number: row.try_get(2)?,
        sender_number: row.try_get(3)?,
        text_decoded: row.try_get(4)?,
    })
}
