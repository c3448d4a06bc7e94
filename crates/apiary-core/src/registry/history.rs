//! Call history log
//!
//! Capacity is enforced by silent trimming: once the log holds more than
//! `max_history` entries, the ones with the oldest `timestamp` go. Eviction
//! follows the timestamp, not insertion order, so a back-dated entry can be
//! evicted before entries appended earlier. An append and its evictions
//! commit as one batch.

use chrono::Utc;

use super::degrade;
use crate::error::{Result, StoreError};
use crate::model::{CallRecord, HistoryEntry};
use crate::namespace::RegistryKind;
use crate::persistence::{Record, RecordRepository, SortOrder, WriteBatch};
use crate::session::Session;

/// History log of the bound application
#[derive(Debug, Clone)]
pub struct HistoryLog {
    session: Session,
}

impl HistoryLog {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Store a completed call and trim the log back to capacity.
    ///
    /// The returned entry carries its assigned id. If the call is older than
    /// everything in a full log it is never stored. On error nothing is
    /// written.
    pub async fn append(&self, call: CallRecord) -> Result<HistoryEntry> {
        let binding = self.session.binding()?;
        let limit = self.session.config().limits.max_history;
        binding
            .history
            .write(move |repo| append(repo, HistoryEntry::from_call(call, Utc::now()), limit))
            .await
    }

    /// Entries newest first; empty if the store cannot be read
    pub async fn get_all(&self) -> Vec<HistoryEntry> {
        degrade(
            RegistryKind::History,
            "get_all",
            self.try_get_all().await,
            Vec::new(),
        )
    }

    /// Entries newest first
    pub async fn try_get_all(&self) -> Result<Vec<HistoryEntry>> {
        let binding = self.session.binding()?;
        binding
            .history
            .read(|repo| repo.get_all(SortOrder::Descending))
            .await
    }

    /// A single entry; `None` if missing or unreadable
    pub async fn get(&self, id: &str) -> Option<HistoryEntry> {
        let id = id.to_string();
        let result = match self.session.binding() {
            Ok(binding) => binding.history.read(move |repo| repo.get_by_id(&id)).await,
            Err(e) => Err(e),
        };
        degrade(RegistryKind::History, "get", result, None)
    }

    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let binding = self.session.binding()?;
        let id = id.to_string();
        binding
            .history
            .write(move |repo| {
                if repo.delete_by_id(&id)? {
                    Ok(())
                } else {
                    Err(StoreError::NotFound(format!("history entry {}", id)))
                }
            })
            .await
    }

    pub async fn clear_all(&self) -> Result<()> {
        let binding = self.session.binding()?;
        binding.history.write(|repo| repo.clear()).await
    }
}

/// Add `entry` and evict the oldest entries beyond `limit`, in one batch.
fn append(
    repo: &dyn RecordRepository<HistoryEntry>,
    entry: HistoryEntry,
    limit: usize,
) -> Result<HistoryEntry> {
    let excess = (repo.count()? + 1).saturating_sub(limit);
    if excess == 0 {
        repo.apply(WriteBatch::putting([entry.clone()]))?;
        return Ok(entry);
    }

    // Equal timestamps go in insertion order, so the new entry sorts last
    let existing = repo.get_all(SortOrder::Ascending)?;
    let position = existing.partition_point(|e| e.sort_key() <= entry.sort_key());
    let stored = position >= excess;
    let evicted = if stored { excess } else { excess - 1 };

    let mut batch = WriteBatch::deleting(existing.into_iter().take(evicted).map(|e| e.id));
    if stored {
        batch.put(entry.clone());
    }
    repo.apply(batch)?;
    tracing::debug!(evicted = excess, limit, stored, "Trimmed history");
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone};

    use super::*;
    use crate::model::{EndpointKey, HttpMethod};
    use crate::namespace::Namespace;
    use crate::persistence::SqliteRepository;

    fn repo() -> SqliteRepository<HistoryEntry> {
        let ns = Namespace::resolve("Pet Store", RegistryKind::History).unwrap();
        SqliteRepository::open_in_memory(&ns).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn entry(secs: i64) -> HistoryEntry {
        HistoryEntry::from_call(CallRecord::new("/pets", HttpMethod::Get).at(at(secs)), Utc::now())
    }

    fn timestamps(repo: &dyn RecordRepository<HistoryEntry>) -> Vec<DateTime<Utc>> {
        repo.get_all(SortOrder::Ascending)
            .unwrap()
            .into_iter()
            .map(|e| e.timestamp)
            .collect()
    }

    /// Reads go to a real store; `count` or `apply` can be made to fail
    struct FailingRepository {
        inner: SqliteRepository<HistoryEntry>,
        fail_count: bool,
        fail_apply: bool,
    }

    impl FailingRepository {
        fn fail() -> Result<()> {
            Err(StoreError::StorageUnavailable("disk full".into()))
        }
    }

    impl RecordRepository<HistoryEntry> for FailingRepository {
        fn get_all(&self, order: SortOrder) -> Result<Vec<HistoryEntry>> {
            self.inner.get_all(order)
        }

        fn get_by_id(&self, id: &str) -> Result<Option<HistoryEntry>> {
            self.inner.get_by_id(id)
        }

        fn find_by_key(&self, key: &EndpointKey) -> Result<Option<HistoryEntry>> {
            self.inner.find_by_key(key)
        }

        fn put(&self, record: HistoryEntry) -> Result<HistoryEntry> {
            self.inner.put(record)
        }

        fn insert(&self, record: HistoryEntry) -> Result<HistoryEntry> {
            self.inner.insert(record)
        }

        fn apply(&self, batch: WriteBatch<HistoryEntry>) -> Result<()> {
            if self.fail_apply {
                return Self::fail();
            }
            self.inner.apply(batch)
        }

        fn delete_by_id(&self, id: &str) -> Result<bool> {
            self.inner.delete_by_id(id)
        }

        fn clear(&self) -> Result<()> {
            self.inner.clear()
        }

        fn count(&self) -> Result<usize> {
            if self.fail_count {
                Self::fail()?;
            }
            self.inner.count()
        }
    }

    #[test]
    fn test_append_under_limit_evicts_nothing() {
        let repo = repo();
        append(&repo, entry(0), 5).unwrap();
        append(&repo, entry(1), 5).unwrap();
        assert_eq!(timestamps(&repo), vec![at(0), at(1)]);
    }

    #[test]
    fn test_append_evicts_oldest_by_timestamp() {
        let repo = repo();
        // Inserted newest first, so insertion order disagrees with timestamps
        for secs in (1..6).rev() {
            repo.put(entry(secs)).unwrap();
        }
        append(&repo, entry(6), 4).unwrap();
        assert_eq!(timestamps(&repo), vec![at(3), at(4), at(5), at(6)]);
    }

    #[test]
    fn test_back_dated_entry_is_never_stored_in_full_log() {
        let repo = repo();
        for secs in 10..13 {
            append(&repo, entry(secs), 3).unwrap();
        }
        let back_dated = append(&repo, entry(0), 3).unwrap();
        assert!(repo.get_by_id(&back_dated.id).unwrap().is_none());
        assert_eq!(timestamps(&repo), vec![at(10), at(11), at(12)]);
    }

    #[test]
    fn test_append_between_existing_entries() {
        let repo = repo();
        for secs in [0, 10, 20] {
            append(&repo, entry(secs), 3).unwrap();
        }
        append(&repo, entry(5), 3).unwrap();
        assert_eq!(timestamps(&repo), vec![at(5), at(10), at(20)]);
    }

    #[test]
    fn test_equal_timestamp_evicts_earlier_insert() {
        let repo = repo();
        let first = append(&repo, entry(0), 1).unwrap();
        let second = append(&repo, entry(0), 1).unwrap();
        assert_eq!(first.sort_key(), second.sort_key());
        assert!(repo.get_by_id(&first.id).unwrap().is_none());
        assert!(repo.get_by_id(&second.id).unwrap().is_some());
    }

    #[test]
    fn test_failed_count_writes_nothing() {
        let repo = FailingRepository {
            inner: repo(),
            fail_count: true,
            fail_apply: false,
        };
        let err = append(&repo, entry(0), 5).unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
        assert_eq!(repo.inner.count().unwrap(), 0);
    }

    #[test]
    fn test_failed_batch_keeps_full_log_intact() {
        let inner = repo();
        for secs in 0..3 {
            append(&inner, entry(secs), 3).unwrap();
        }
        let repo = FailingRepository {
            inner,
            fail_count: false,
            fail_apply: true,
        };
        assert!(append(&repo, entry(3), 3).is_err());
        assert_eq!(timestamps(&repo.inner), vec![at(0), at(1), at(2)]);
    }
}
