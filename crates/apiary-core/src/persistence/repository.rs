//! Namespace-scoped record repository
//!
//! The capability set every registry is written against. Each call is a
//! single transaction: it commits completely or leaves the store untouched.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Params, Transaction};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::handle::StoreHandle;
use crate::error::{Result, StoreError};
use crate::model::EndpointKey;
use crate::namespace::{Namespace, RegistryKind};

/// Primary key of a stored record (UUID v4 text)
pub type RecordId = String;

/// Direction of the kind's sort index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// A value stored in one of the namespace collections.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in
    const KIND: RegistryKind;

    fn id(&self) -> &str;

    /// Value of the kind's ordering index (tab order, or a timestamp in
    /// milliseconds)
    fn sort_key(&self) -> i64;

    /// Composite key, if the record refers to an endpoint
    fn endpoint_key(&self) -> Option<EndpointKey>;
}

/// Sort key of a timestamp, at full nanosecond precision.
///
/// Instants outside the representable range (before 1677 or after 2262)
/// clamp to the ends of the key space.
pub fn timestamp_sort_key(at: &DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(if at.timestamp() < 0 {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Deletes and upserts committed together.
///
/// Deletes are applied before upserts.
#[derive(Debug, Clone)]
pub struct WriteBatch<R> {
    deletes: Vec<RecordId>,
    puts: Vec<R>,
}

impl<R> Default for WriteBatch<R> {
    fn default() -> Self {
        Self {
            deletes: Vec::new(),
            puts: Vec::new(),
        }
    }
}

impl<R> WriteBatch<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deleting(ids: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            deletes: ids.into_iter().collect(),
            puts: Vec::new(),
        }
    }

    pub fn putting(records: impl IntoIterator<Item = R>) -> Self {
        Self {
            deletes: Vec::new(),
            puts: records.into_iter().collect(),
        }
    }

    pub fn delete(&mut self, id: impl Into<RecordId>) -> &mut Self {
        self.deletes.push(id.into());
        self
    }

    pub fn put(&mut self, record: R) -> &mut Self {
        self.puts.push(record);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.puts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deletes.len() + self.puts.len()
    }
}

/// Storage capabilities shared by all registries
pub trait RecordRepository<R: Record>: Send + Sync {
    /// All records ordered by the kind's sort index
    fn get_all(&self, order: SortOrder) -> Result<Vec<R>>;

    /// Get a record by ID
    fn get_by_id(&self, id: &str) -> Result<Option<R>>;

    /// Get the record stored under a composite key
    fn find_by_key(&self, key: &EndpointKey) -> Result<Option<R>>;

    /// Insert or replace by ID
    fn put(&self, record: R) -> Result<R>;

    /// Insert a new record. A composite-key conflict fails with `Duplicate`.
    fn insert(&self, record: R) -> Result<R>;

    /// Apply a batch in one transaction
    fn apply(&self, batch: WriteBatch<R>) -> Result<()>;

    /// Delete by ID. Returns whether a record existed.
    fn delete_by_id(&self, id: &str) -> Result<bool>;

    /// Delete every record
    fn clear(&self) -> Result<()>;

    /// Number of stored records
    fn count(&self) -> Result<usize>;
}

/// SQLite-backed implementation of [`RecordRepository`]
pub struct SqliteRepository<R> {
    handle: Arc<StoreHandle>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> SqliteRepository<R> {
    /// Wrap a handle. The handle's namespace must belong to `R`'s kind.
    pub fn new(handle: Arc<StoreHandle>) -> Result<Self> {
        let kind = handle.namespace().kind();
        if kind != R::KIND {
            return Err(StoreError::InvalidNamespace(format!(
                "namespace {} holds {} records, not {}",
                handle.namespace(),
                kind,
                R::KIND
            )));
        }
        Ok(Self {
            handle,
            _record: PhantomData,
        })
    }

    /// Repository over a fresh in-memory store
    pub fn open_in_memory(namespace: &Namespace) -> Result<Self> {
        Self::new(Arc::new(StoreHandle::open_in_memory(namespace)?))
    }

    pub fn handle(&self) -> &Arc<StoreHandle> {
        &self.handle
    }

    fn table() -> &'static str {
        R::KIND.table()
    }

    fn query_records<P: Params>(tx: &Transaction<'_>, sql: &str, params: P) -> Result<Vec<R>> {
        let mut stmt = tx.prepare(sql)?;
        let bodies = stmt
            .query_map(params, |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        bodies.iter().map(|body| decode(body)).collect()
    }

    fn write_row(tx: &Transaction<'_>, record: &R, upsert: bool) -> Result<()> {
        let body = serde_json::to_string(record)?;
        let key = record.endpoint_key();
        let on_conflict = if upsert {
            " ON CONFLICT(id) DO UPDATE SET sort_key = excluded.sort_key, path = excluded.path, \
             method = excluded.method, body = excluded.body"
        } else {
            ""
        };
        let sql = format!(
            "INSERT INTO {} (id, sort_key, path, method, body) VALUES (?1, ?2, ?3, ?4, ?5){}",
            Self::table(),
            on_conflict
        );
        tx.execute(
            &sql,
            params![
                record.id(),
                record.sort_key(),
                key.as_ref().map(|k| k.path.as_str()),
                key.as_ref().map(|k| k.method.as_str()),
                body,
            ],
        )
        .map_err(|e| conflict_error(e, record))?;
        Ok(())
    }

    fn delete_row(tx: &Transaction<'_>, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", Self::table());
        Ok(tx.execute(&sql, params![id])? > 0)
    }
}

impl<R: Record> RecordRepository<R> for SqliteRepository<R> {
    fn get_all(&self, order: SortOrder) -> Result<Vec<R>> {
        let sql = format!(
            "SELECT body FROM {} ORDER BY sort_key {dir}, rowid {dir}",
            Self::table(),
            dir = order.sql()
        );
        self.handle
            .with_transaction(|tx| Self::query_records(tx, &sql, []))
    }

    fn get_by_id(&self, id: &str) -> Result<Option<R>> {
        let sql = format!("SELECT body FROM {} WHERE id = ?1", Self::table());
        self.handle.with_transaction(|tx| {
            Ok(Self::query_records(tx, &sql, params![id])?.into_iter().next())
        })
    }

    fn find_by_key(&self, key: &EndpointKey) -> Result<Option<R>> {
        let sql = format!(
            "SELECT body FROM {} WHERE path = ?1 AND method = ?2 ORDER BY sort_key LIMIT 1",
            Self::table()
        );
        self.handle.with_transaction(|tx| {
            Ok(
                Self::query_records(tx, &sql, params![key.path, key.method.as_str()])?
                    .into_iter()
                    .next(),
            )
        })
    }

    fn put(&self, record: R) -> Result<R> {
        self.handle
            .with_transaction(|tx| Self::write_row(tx, &record, true))?;
        Ok(record)
    }

    fn insert(&self, record: R) -> Result<R> {
        self.handle
            .with_transaction(|tx| Self::write_row(tx, &record, false))?;
        Ok(record)
    }

    fn apply(&self, batch: WriteBatch<R>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.handle.with_transaction(|tx| {
            for id in &batch.deletes {
                Self::delete_row(tx, id)?;
            }
            for record in &batch.puts {
                Self::write_row(tx, record, true)?;
            }
            Ok(())
        })
    }

    fn delete_by_id(&self, id: &str) -> Result<bool> {
        self.handle.with_transaction(|tx| Self::delete_row(tx, id))
    }

    fn clear(&self) -> Result<()> {
        let sql = format!("DELETE FROM {}", Self::table());
        self.handle.with_transaction(|tx| {
            tx.execute(&sql, [])?;
            Ok(())
        })
    }

    fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", Self::table());
        self.handle.with_transaction(|tx| {
            let count: i64 = tx.query_row(&sql, [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}

fn decode<R: DeserializeOwned>(body: &str) -> Result<R> {
    serde_json::from_str(body).map_err(|e| StoreError::Serialization(format!("decode record: {}", e)))
}

fn conflict_error<R: Record>(err: rusqlite::Error, record: &R) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation && R::KIND.unique_endpoints() {
            if let Some(key) = record.endpoint_key() {
                return StoreError::Duplicate(key);
            }
        }
    }
    StoreError::from(err)
}
