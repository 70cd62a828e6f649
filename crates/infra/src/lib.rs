//! `recipeshare-infra`
//!
//! **Responsibility:** everything persisted on the device.
//!
//! - `local_store`: the offline recipe cache (in-memory and SQLite)
//! - `unsynced`: ledger of writes the remote collection has not accepted yet
//! - `sqlite`: shared pool setup and database location

pub mod error;
pub mod local_store;
pub mod sqlite;
pub mod unsynced;

pub use error::LocalStoreError;
pub use local_store::{InMemoryLocalStore, LocalStore, SqliteLocalStore};
pub use unsynced::{
    InMemoryUnsyncedLedger, PendingOp, PendingWrite, SqliteUnsyncedLedger, UnsyncedLedger,
};
