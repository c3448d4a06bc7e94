//! Lifecycle of one namespace database

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};

use super::repository::timestamp_sort_key;
use super::schema::{Schema, SCHEMA_VERSION};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::namespace::{Namespace, RegistryKind};

/// Owns the connection to one namespace's versioned collection store.
///
/// The database (and its directory) is created on first open. The schema
/// is declared or migrated before the handle is returned, so every handle
/// in circulation is at [`SCHEMA_VERSION`].
pub struct StoreHandle {
    namespace: Namespace,
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
}

impl StoreHandle {
    /// Open (or create) the store for `namespace` as configured.
    pub fn open(namespace: &Namespace, config: &StoreConfig) -> Result<Self> {
        if config.in_memory {
            return Self::open_in_memory(namespace);
        }

        let dir = config
            .resolved_data_dir()
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        std::fs::create_dir_all(&dir).map_err(|e| {
            StoreError::StorageUnavailable(format!("create {}: {}", dir.display(), e))
        })?;
        let path = dir.join(namespace.file_name());

        let conn = Connection::open(&path)
            .map_err(|e| StoreError::StorageUnavailable(format!("open {}: {}", path.display(), e)))?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        let handle = Self::with_connection_at(namespace, Some(path), conn)?;
        tracing::info!(
            namespace = %handle.namespace,
            path = ?handle.path,
            "Opened store"
        );
        Ok(handle)
    }

    /// Create an in-memory store (for testing and ephemeral sessions)
    pub fn open_in_memory(namespace: &Namespace) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::StorageUnavailable(format!("open_in_memory: {}", e)))?;
        let handle = Self::with_connection_at(namespace, None, conn)?;
        tracing::debug!(namespace = %handle.namespace, "Opened in-memory store");
        Ok(handle)
    }

    fn with_connection_at(
        namespace: &Namespace,
        path: Option<PathBuf>,
        mut conn: Connection,
    ) -> Result<Self> {
        Self::initialize(&mut conn, namespace.kind())?;
        Ok(Self {
            namespace: namespace.clone(),
            path,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Declare or migrate the schema
    fn initialize(conn: &mut Connection, kind: RegistryKind) -> Result<()> {
        conn.execute_batch(Schema::version_table())?;
        let current_version = Self::read_schema_version(conn)?;

        if current_version == SCHEMA_VERSION {
            return Ok(());
        }
        if current_version > SCHEMA_VERSION {
            return Err(StoreError::StorageUnavailable(format!(
                "store schema version {} is newer than supported version {}",
                current_version, SCHEMA_VERSION
            )));
        }

        let tx = conn.transaction()?;
        if current_version == 0 {
            // Fresh database, create everything at the current version
            tx.execute_batch(&Schema::create_tables(kind))?;
        } else {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(kind, version, version + 1) {
                    tracing::info!(%kind, from = version, to = version + 1, "Migrating store");
                    tx.execute_batch(&migration)?;
                }
                if let Some(field) = Schema::rekey_field(kind, version, version + 1) {
                    let rekeyed = Self::rekey_timestamps(&tx, kind, field)?;
                    tracing::info!(%kind, field, rekeyed, "Recomputed sort keys");
                }
            }
        }
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Recompute `sort_key` of every row from the body's `field` timestamp
    fn rekey_timestamps(tx: &Transaction<'_>, kind: RegistryKind, field: &str) -> Result<usize> {
        let table = kind.table();
        let rows = {
            let mut stmt = tx.prepare(&format!("SELECT id, body FROM {}", table))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut update =
            tx.prepare(&format!("UPDATE {} SET sort_key = ?1 WHERE id = ?2", table))?;
        for (id, body) in &rows {
            let value: serde_json::Value = serde_json::from_str(body)?;
            let raw = value.get(field).and_then(|v| v.as_str()).ok_or_else(|| {
                StoreError::Serialization(format!("{} {}: missing {}", table, id, field))
            })?;
            let at = DateTime::parse_from_rfc3339(raw)
                .map_err(|e| StoreError::Serialization(format!("{} {}: {}", table, id, e)))?
                .with_timezone(&Utc);
            update.execute(params![timestamp_sort_key(&at), id])?;
        }
        Ok(rows.len())
    }

    fn read_schema_version(conn: &Connection) -> Result<u32> {
        let version: Option<u32> =
            conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })?;
        Ok(version.unwrap_or(0))
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Database file, or `None` for in-memory stores
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Schema version currently recorded in the store
    pub fn schema_version(&self) -> Result<u32> {
        self.with_connection(|conn| Self::read_schema_version(conn))
    }

    /// Run `f` with exclusive use of the connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::StorageUnavailable(format!("connection lock poisoned: {}", e)))?;
        let conn = guard.as_mut().ok_or_else(|| {
            StoreError::StorageUnavailable(format!("store {} is closed", self.namespace))
        })?;
        f(conn)
    }

    /// Run `f` inside one transaction.
    ///
    /// The transaction commits only if `f` succeeds; any error (or a panic
    /// unwinding through) drops it, which rolls back.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }

    /// Close the connection. Later calls fail with `StorageUnavailable`.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| StoreError::StorageUnavailable(format!("connection lock poisoned: {}", e)))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StoreError::from(e))?;
            tracing::debug!(namespace = %self.namespace, "Closed store");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|g| g.is_none()).unwrap_or(true)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("namespace", &self.namespace)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
