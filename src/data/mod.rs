//! Data layer module
//!
//! Handles all data persistence:
//! - Document store interface (collections of JSON documents)
//! - SQLite backend (durable)
//! - In-memory backend (tests, throwaway instances)

mod memory;
mod models;
mod sqlite;
mod store;

pub use memory::MemoryStore;
pub use models::*;
pub use sqlite::SqliteStore;
pub use store::{
    Direction, Document, DocumentStore, FieldChange, Fields, Filter, Patch, Query, WriteBatch,
    WriteOp, compare_values, encode,
};
