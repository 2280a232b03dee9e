//! Repository layer for the destination store.
//!
//! Database access uses Diesel ORM with compile-time query checking.
//! Supports SQLite and, with the `mysql` feature, MySQL.

pub mod connection;
pub mod diesel_models;
pub mod diesel_status;
pub mod memory;
pub mod store;
pub mod util;

pub use connection::{Backend, DbConnection};
pub use diesel_status::{DatabaseConnector, DieselStatusStore};
pub use memory::{FailureModes, MemoryDatabase, MemoryStatusStore};
pub use store::{StatusStore, StoreConnector, StoreSummary};
