//! Schema migration tests against databases written by the v1 layout

mod common;

use std::path::Path;
use std::sync::Arc;

use apiary_core::persistence::SCHEMA_VERSION;
use apiary_core::{
    EndpointKey, FavoriteMeta, FavoriteRecord, HistoryEntry, Namespace, RecordRepository,
    RegistryKind, SortOrder, SqliteRepository, StoreConfig, StoreHandle, TabMeta, TabRecord,
};
use chrono::{Duration, Utc};
use common::{at, call_at, get};
use rusqlite::{params, Connection};

/// Write `records` into a v1 store: same table, no unique endpoint index.
fn write_v1<R: serde::Serialize>(
    path: &Path,
    kind: RegistryKind,
    records: &[(String, i64, EndpointKey, R)],
) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(&format!(
        r#"
CREATE TABLE schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT INTO schema_version (version) VALUES (1);
CREATE TABLE {table} (
    id TEXT PRIMARY KEY,
    sort_key INTEGER NOT NULL,
    path TEXT,
    method TEXT,
    body TEXT NOT NULL
);
CREATE INDEX idx_{table}_endpoint ON {table}(path, method);
"#,
        table = kind.table()
    ))
    .unwrap();

    let sql = format!(
        "INSERT INTO {} (id, sort_key, path, method, body) VALUES (?1, ?2, ?3, ?4, ?5)",
        kind.table()
    );
    for (id, sort_key, key, record) in records {
        conn.execute(
            &sql,
            params![
                id,
                sort_key,
                key.path,
                key.method.as_str(),
                serde_json::to_string(record).unwrap()
            ],
        )
        .unwrap();
    }
}

fn tab(key: EndpointKey, order: u32) -> TabRecord {
    TabRecord::new(key, TabMeta::default(), order, at(i64::from(order)))
}

#[test]
fn test_v1_tabs_are_deduplicated_and_renumbered() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = Namespace::resolve("Pet Store", RegistryKind::Tabs).unwrap();
    let path = dir.path().join(namespace.file_name());

    let a = tab(get("/a"), 0);
    let dup = tab(get("/b"), 1);
    let b = tab(get("/b"), 2);
    let c = tab(get("/c"), 3);
    let rows: Vec<_> = [&a, &dup, &b, &c]
        .iter()
        .map(|t| (t.id.clone(), i64::from(t.order), t.endpoint.clone(), (*t).clone()))
        .collect();
    write_v1(&path, RegistryKind::Tabs, &rows);

    let handle = StoreHandle::open(&namespace, &StoreConfig::at(dir.path())).unwrap();
    assert_eq!(handle.schema_version().unwrap(), SCHEMA_VERSION);

    let repo = SqliteRepository::<TabRecord>::new(Arc::new(handle)).unwrap();
    let tabs = repo.get_all(SortOrder::Ascending).unwrap();
    let ids: Vec<&str> = tabs.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
    // Stored bodies agree with the renumbered index column
    let orders: Vec<u32> = tabs.iter().map(|t| t.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);

    // The endpoint key is now enforced
    let err = repo.insert(tab(get("/a"), 3)).unwrap_err();
    assert_eq!(err, apiary_core::StoreError::Duplicate(get("/a")));
}

#[test]
fn test_v1_favorites_keep_latest_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = Namespace::resolve("Pet Store", RegistryKind::Favorites).unwrap();
    let path = dir.path().join(namespace.file_name());

    let older = FavoriteRecord::new(get("/pets"), FavoriteMeta::titled("old"), at(0));
    let newer = FavoriteRecord::new(get("/pets"), FavoriteMeta::titled("new"), at(10));
    let other = FavoriteRecord::new(get("/owners"), FavoriteMeta::titled("owners"), at(5));
    let rows: Vec<_> = [&older, &newer, &other]
        .iter()
        .map(|f| {
            (
                f.id.clone(),
                f.created_at.timestamp_millis(),
                f.endpoint(),
                (*f).clone(),
            )
        })
        .collect();
    write_v1(&path, RegistryKind::Favorites, &rows);

    let handle = StoreHandle::open(&namespace, &StoreConfig::at(dir.path())).unwrap();
    let repo = SqliteRepository::<FavoriteRecord>::new(Arc::new(handle)).unwrap();
    let titles: Vec<String> = repo
        .get_all(SortOrder::Descending)
        .unwrap()
        .into_iter()
        .map(|f| f.title)
        .collect();
    assert_eq!(titles, vec!["new", "owners"]);
}

#[test]
fn test_millisecond_keys_are_recomputed_at_full_precision() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = Namespace::resolve("Pet Store", RegistryKind::History).unwrap();
    let path = dir.path().join(namespace.file_name());

    // Same millisecond, and the newer call has the lower rowid
    let newer = HistoryEntry::from_call(
        call_at("/newer", 0).at(at(0) + Duration::microseconds(500)),
        Utc::now(),
    );
    let older = HistoryEntry::from_call(
        call_at("/older", 0).at(at(0) + Duration::microseconds(200)),
        Utc::now(),
    );
    let rows: Vec<_> = [&newer, &older]
        .iter()
        .map(|e| {
            (
                e.id.clone(),
                e.timestamp.timestamp_millis(),
                e.endpoint(),
                (*e).clone(),
            )
        })
        .collect();
    write_v1(&path, RegistryKind::History, &rows);

    let handle = StoreHandle::open(&namespace, &StoreConfig::at(dir.path())).unwrap();
    let repo = SqliteRepository::<HistoryEntry>::new(Arc::new(handle)).unwrap();
    let paths: Vec<String> = repo
        .get_all(SortOrder::Ascending)
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    assert_eq!(paths, vec!["/older", "/newer"]);
}

#[test]
fn test_migration_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    let namespace = Namespace::resolve("Pet Store", RegistryKind::Favorites).unwrap();
    write_v1::<FavoriteRecord>(
        &dir.path().join(namespace.file_name()),
        RegistryKind::Favorites,
        &[],
    );

    let config = StoreConfig::at(dir.path());
    StoreHandle::open(&namespace, &config).unwrap().close().unwrap();
    let handle = StoreHandle::open(&namespace, &config).unwrap();

    let versions: Vec<u32> = handle
        .with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT version FROM schema_version ORDER BY rowid")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<Result<Vec<u32>, _>>()?;
            Ok(rows)
        })
        .unwrap();
    assert_eq!(versions, vec![1, SCHEMA_VERSION]);
}
