//! Store backends for the SMS daemon's `inbox`/`outbox` tables.
//!
//! * [`MySqlBackend`] talks to the daemon's MySQL/MariaDB database through `sqlx`
//! * [`MemoryBackend`] keeps the tables in process and can script failures

pub mod memory;
pub mod mysql;
pub mod statement;

pub use memory::{MemoryBackend, MemoryConnection};
pub use mysql::{MySqlBackend, MySqlStore};
pub use statement::{SqlValue, Statement};
