//! Apiary Core - Local collection engine for an API documentation workbench
//!
//! Each documented API ("application") gets three registries, each kept in
//! its own store:
//!
//! - **Tabs**: open endpoint tabs with a dense display order and a hard capacity
//! - **History**: completed calls, trimmed to capacity by timestamp
//! - **Favorites**: starred endpoints, deduplicated by path and method
//!
//! # Architecture
//!
//! ```text
//! Session ─bind(app)─▶ Binding ─▶ Scope<R> ─▶ RecordRepository<R> ─▶ StoreHandle
//!                                  (writer gate)   (SqliteRepository)   (one SQLite file)
//! ```
//!
//! - **Namespace**: application name plus registry kind resolves to a store name
//! - **Persistence**: versioned SQLite store per namespace, JSON record bodies
//! - **Registry**: tab/history/favorite policies over the repository
//! - **Config**: data directory, capacities, connection settings

pub mod config;
pub mod error;
pub mod model;
pub mod namespace;
pub mod persistence;
pub mod registry;
pub mod session;

pub use config::{ConfigError, LimitsConfig, StoreConfig};
pub use error::{Result, StoreError};
pub use model::{
    ActivePane, CallRecord, EndpointKey, EndpointSnapshot, FavoriteMeta, FavoriteRecord,
    HistoryEntry, HttpMethod, RequestSnapshot, ResponseCacheSnapshot, ResponseSnapshot, TabMeta,
    TabRecord, TabUpdate,
};
pub use namespace::{slugify, Namespace, RegistryKind};
pub use persistence::{RecordRepository, SortOrder, SqliteRepository, StoreHandle, WriteBatch};
pub use registry::{FavoritesRegistry, HistoryLog, TabRegistry};
pub use session::{Repositories, Session};
