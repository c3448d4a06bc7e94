//! Favorited endpoints

use std::collections::HashSet;

use chrono::Utc;

use super::degrade;
use crate::error::{Result, StoreError};
use crate::model::{EndpointKey, FavoriteMeta, FavoriteRecord};
use crate::namespace::RegistryKind;
use crate::persistence::{RecordRepository, SortOrder, WriteBatch};
use crate::session::Session;

/// Favorites of the bound application
#[derive(Debug, Clone)]
pub struct FavoritesRegistry {
    session: Session,
}

impl FavoritesRegistry {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Favorite an endpoint. Fails with `Duplicate` if it already is one.
    pub async fn add(&self, key: EndpointKey, meta: FavoriteMeta) -> Result<FavoriteRecord> {
        let binding = self.session.binding()?;
        binding
            .favorites
            .write(move |repo| add(repo, key, meta))
            .await
    }

    /// Unfavorite an endpoint. Fails with `NotFound` if it is not one.
    pub async fn remove(&self, key: &EndpointKey) -> Result<()> {
        let binding = self.session.binding()?;
        let key = key.clone();
        binding
            .favorites
            .write(move |repo| remove(repo, &key))
            .await
    }

    /// Flip the favorite state of an endpoint and return the new state
    pub async fn toggle(&self, key: EndpointKey, meta: FavoriteMeta) -> Result<bool> {
        let binding = self.session.binding()?;
        binding
            .favorites
            .write(move |repo| {
                if find(repo, &key)?.is_some() {
                    remove(repo, &key)?;
                    Ok(false)
                } else {
                    add(repo, key, meta)?;
                    Ok(true)
                }
            })
            .await
    }

    /// Remove every favorite
    pub async fn clear(&self) -> Result<()> {
        let binding = self.session.binding()?;
        binding.favorites.write(|repo| repo.clear()).await
    }

    /// Whether an endpoint is a favorite; `false` if the store cannot be read
    pub async fn is_favorite(&self, key: &EndpointKey) -> bool {
        let key = key.clone();
        let result = match self.session.binding() {
            Ok(binding) => {
                binding
                    .favorites
                    .read(move |repo| Ok(find(repo, &key)?.is_some()))
                    .await
            }
            Err(e) => Err(e),
        };
        degrade(RegistryKind::Favorites, "is_favorite", result, false)
    }

    /// Favorites newest first; empty if the store cannot be read
    pub async fn list(&self) -> Vec<FavoriteRecord> {
        degrade(
            RegistryKind::Favorites,
            "list",
            self.try_list().await,
            Vec::new(),
        )
    }

    /// Favorites newest first
    pub async fn try_list(&self) -> Result<Vec<FavoriteRecord>> {
        let binding = self.session.binding()?;
        binding
            .favorites
            .read(|repo| repo.get_all(SortOrder::Descending))
            .await
    }

    /// Remove favorites whose endpoint no longer exists in `current`.
    ///
    /// Only (path, method) is compared. Safe to call on every load; returns
    /// how many favorites were removed, or 0 if the sweep could not run.
    pub async fn cleanup_orphans(&self, current: &[EndpointKey]) -> usize {
        let current: HashSet<EndpointKey> = current.iter().cloned().collect();
        let result = match self.session.binding() {
            Ok(binding) => {
                binding
                    .favorites
                    .write(move |repo| cleanup_orphans(repo, &current))
                    .await
            }
            Err(e) => Err(e),
        };
        degrade(RegistryKind::Favorites, "cleanup_orphans", result, 0)
    }
}

fn find(
    repo: &dyn RecordRepository<FavoriteRecord>,
    key: &EndpointKey,
) -> Result<Option<FavoriteRecord>> {
    Ok(repo
        .get_all(SortOrder::Descending)?
        .into_iter()
        .find(|fav| fav.matches(key)))
}

fn add(
    repo: &dyn RecordRepository<FavoriteRecord>,
    key: EndpointKey,
    meta: FavoriteMeta,
) -> Result<FavoriteRecord> {
    if find(repo, &key)?.is_some() {
        return Err(StoreError::Duplicate(key));
    }
    repo.insert(FavoriteRecord::new(key, meta, Utc::now()))
}

fn remove(repo: &dyn RecordRepository<FavoriteRecord>, key: &EndpointKey) -> Result<()> {
    let favorite = find(repo, key)?.ok_or_else(|| StoreError::NotFound(format!("favorite {}", key)))?;
    repo.delete_by_id(&favorite.id)?;
    Ok(())
}

fn cleanup_orphans(
    repo: &dyn RecordRepository<FavoriteRecord>,
    current: &HashSet<EndpointKey>,
) -> Result<usize> {
    let orphans: Vec<String> = repo
        .get_all(SortOrder::Descending)?
        .into_iter()
        .filter(|fav| !current.contains(&fav.endpoint()))
        .map(|fav| fav.id)
        .collect();

    let removed = orphans.len();
    if removed > 0 {
        repo.apply(WriteBatch::deleting(orphans))?;
        tracing::info!(removed, "Removed orphaned favorites");
    }
    Ok(removed)
}
