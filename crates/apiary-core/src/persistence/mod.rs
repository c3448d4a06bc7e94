//! Persistence layer for the namespace stores
//!
//! One SQLite database per namespace, one collection table per database.

mod handle;
mod repository;
mod schema;

pub use handle::StoreHandle;
pub use repository::{
    timestamp_sort_key, Record, RecordId, RecordRepository, SortOrder, SqliteRepository,
    WriteBatch,
};
pub use schema::{Schema, SCHEMA_VERSION};
