//! Open endpoint tabs
//!
//! Tabs move through absent → active → background → closed. A tab is
//! active when it has the greatest `last_accessed_at`; nothing else is
//! stored about activity. `order` stays a dense `0..n-1` sequence across
//! every write.

use chrono::Utc;

use super::degrade;
use crate::error::{Result, StoreError};
use crate::model::{EndpointKey, TabMeta, TabRecord, TabUpdate};
use crate::namespace::RegistryKind;
use crate::persistence::{RecordRepository, SortOrder, WriteBatch};
use crate::session::Session;

/// Tab registry of the bound application
#[derive(Debug, Clone)]
pub struct TabRegistry {
    session: Session,
}

impl TabRegistry {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Activate the tab for `key`, opening it if needed.
    ///
    /// Fails with `LimitExceeded` when a new tab would exceed the configured
    /// capacity; nothing is written in that case.
    pub async fn find_or_create(&self, key: EndpointKey, meta: TabMeta) -> Result<TabRecord> {
        let binding = self.session.binding()?;
        let limit = self.session.config().limits.max_tabs;
        binding
            .tabs
            .write(move |repo| find_or_create(repo, key, meta, limit))
            .await
    }

    /// Move tab `id` to `new_index` and return the renumbered sequence.
    ///
    /// An index past the end moves the tab to the last position.
    pub async fn reorder(&self, id: &str, new_index: usize) -> Result<Vec<TabRecord>> {
        let binding = self.session.binding()?;
        let id = id.to_string();
        binding
            .tabs
            .write(move |repo| reorder(repo, &id, new_index))
            .await
    }

    /// Make an existing tab the active one
    pub async fn activate(&self, id: &str) -> Result<TabRecord> {
        let binding = self.session.binding()?;
        let id = id.to_string();
        binding
            .tabs
            .write(move |repo| {
                let tab = repo
                    .get_by_id(&id)?
                    .ok_or_else(|| StoreError::NotFound(format!("tab {}", id)))?;
                touch(repo, tab)
            })
            .await
    }

    /// Record interaction state (response selection, pane, cached responses).
    /// Does not change which tab is active.
    pub async fn update(&self, id: &str, update: TabUpdate) -> Result<TabRecord> {
        let binding = self.session.binding()?;
        let id = id.to_string();
        binding
            .tabs
            .write(move |repo| {
                let mut tab = repo
                    .get_by_id(&id)?
                    .ok_or_else(|| StoreError::NotFound(format!("tab {}", id)))?;
                update.apply_to(&mut tab);
                repo.put(tab)
            })
            .await
    }

    /// Close a tab. The caller decides which tab becomes active next.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let binding = self.session.binding()?;
        let id = id.to_string();
        binding.tabs.write(move |repo| close(repo, &id)).await
    }

    /// Close every tab
    pub async fn clear(&self) -> Result<()> {
        let binding = self.session.binding()?;
        binding.tabs.write(|repo| repo.clear()).await
    }

    /// Tabs in display order; empty if the store cannot be read
    pub async fn list(&self) -> Vec<TabRecord> {
        degrade(RegistryKind::Tabs, "list", self.try_list().await, Vec::new())
    }

    /// Tabs in display order
    pub async fn try_list(&self) -> Result<Vec<TabRecord>> {
        let binding = self.session.binding()?;
        binding
            .tabs
            .read(|repo| repo.get_all(SortOrder::Ascending))
            .await
    }

    /// The tab with the greatest `last_accessed_at`.
    ///
    /// Ties are not broken deliberately: among equal timestamps the one
    /// later in display order wins.
    pub async fn active(&self) -> Option<TabRecord> {
        active_of(self.list().await)
    }
}

pub(crate) fn active_of(tabs: Vec<TabRecord>) -> Option<TabRecord> {
    tabs.into_iter().max_by_key(|tab| tab.last_accessed_at)
}

fn touch(repo: &dyn RecordRepository<TabRecord>, mut tab: TabRecord) -> Result<TabRecord> {
    tab.last_accessed_at = Utc::now();
    repo.put(tab)
}

fn find_or_create(
    repo: &dyn RecordRepository<TabRecord>,
    key: EndpointKey,
    meta: TabMeta,
    limit: usize,
) -> Result<TabRecord> {
    let tabs = repo.get_all(SortOrder::Ascending)?;
    if let Some(existing) = tabs.iter().find(|tab| tab.endpoint == key) {
        return touch(repo, existing.clone());
    }

    if tabs.len() >= limit {
        tracing::debug!(%key, limit, "Tab limit reached");
        return Err(StoreError::LimitExceeded { limit });
    }

    let order = tabs.iter().map(|tab| tab.order).max().map_or(0, |max| max + 1);
    let tab = TabRecord::new(key.clone(), meta, order, Utc::now());
    match repo.insert(tab) {
        Ok(tab) => Ok(tab),
        // Another connection to the same file inserted the key after our read.
        Err(StoreError::Duplicate(_)) => {
            let existing = repo
                .find_by_key(&key)?
                .ok_or_else(|| StoreError::NotFound(format!("tab {}", key)))?;
            touch(repo, existing)
        }
        Err(e) => Err(e),
    }
}

fn reorder(
    repo: &dyn RecordRepository<TabRecord>,
    id: &str,
    new_index: usize,
) -> Result<Vec<TabRecord>> {
    let mut tabs = repo.get_all(SortOrder::Ascending)?;
    let position = tabs
        .iter()
        .position(|tab| tab.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("tab {}", id)))?;

    let tab = tabs.remove(position);
    let index = new_index.min(tabs.len());
    tabs.insert(index, tab);
    for (position, tab) in tabs.iter_mut().enumerate() {
        tab.order = position as u32;
    }

    repo.apply(WriteBatch::putting(tabs.iter().cloned()))?;
    Ok(tabs)
}

fn close(repo: &dyn RecordRepository<TabRecord>, id: &str) -> Result<()> {
    let mut tabs = repo.get_all(SortOrder::Ascending)?;
    let position = tabs
        .iter()
        .position(|tab| tab.id == id)
        .ok_or_else(|| StoreError::NotFound(format!("tab {}", id)))?;
    let closed = tabs.remove(position);

    let mut batch = WriteBatch::new();
    batch.delete(closed.id);
    for (position, tab) in tabs.iter_mut().enumerate() {
        if tab.order != position as u32 {
            tab.order = position as u32;
            batch.put(tab.clone());
        }
    }
    tracing::debug!(closed = %closed.endpoint, renumbered = batch.len() - 1, "Closed tab");
    repo.apply(batch)
}
