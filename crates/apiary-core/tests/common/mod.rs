//! Shared fixtures for the integration tests

#![allow(dead_code)]

use apiary_core::persistence::Record;
use apiary_core::{
    CallRecord, EndpointKey, HttpMethod, RecordRepository, Repositories, Result, Session,
    SortOrder, StoreConfig, StoreError, WriteBatch,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Session bound to an in-memory application
pub fn bound_session(application: &str) -> Session {
    let session = Session::in_memory();
    session
        .bind(application)
        .unwrap_or_else(|e| panic!("bind {}: {}", application, e));
    session
}

/// Session with custom limits, bound to an in-memory application
pub fn bound_session_with_limits(
    application: &str,
    max_tabs: usize,
    max_history: usize,
) -> Session {
    let mut config = StoreConfig::in_memory();
    config.limits.max_tabs = max_tabs;
    config.limits.max_history = max_history;
    let session = Session::new(config).unwrap();
    session.bind(application).unwrap();
    session
}

pub fn get(path: &str) -> EndpointKey {
    EndpointKey::new(path, HttpMethod::Get)
}

/// A fixed instant plus `secs` seconds
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
}

pub fn call_at(path: &str, secs: i64) -> CallRecord {
    CallRecord::new(path, HttpMethod::Get).at(at(secs))
}

/// Repository whose every call fails as an unreachable store would
pub struct BrokenRepository;

fn broken<T>() -> Result<T> {
    Err(StoreError::StorageUnavailable("disk unplugged".into()))
}

impl<R: Record> RecordRepository<R> for BrokenRepository {
    fn get_all(&self, _order: SortOrder) -> Result<Vec<R>> {
        broken()
    }

    fn get_by_id(&self, _id: &str) -> Result<Option<R>> {
        broken()
    }

    fn find_by_key(&self, _key: &EndpointKey) -> Result<Option<R>> {
        broken()
    }

    fn put(&self, _record: R) -> Result<R> {
        broken()
    }

    fn insert(&self, _record: R) -> Result<R> {
        broken()
    }

    fn apply(&self, _batch: WriteBatch<R>) -> Result<()> {
        broken()
    }

    fn delete_by_id(&self, _id: &str) -> Result<bool> {
        broken()
    }

    fn clear(&self) -> Result<()> {
        broken()
    }

    fn count(&self) -> Result<usize> {
        broken()
    }
}

/// Session bound to an application whose stores are all broken
pub fn broken_session(application: &str) -> Session {
    use std::sync::Arc;

    let session = Session::in_memory();
    session
        .bind_with(
            application,
            Repositories {
                tabs: Arc::new(BrokenRepository),
                history: Arc::new(BrokenRepository),
                favorites: Arc::new(BrokenRepository),
            },
        )
        .unwrap();
    session
}
