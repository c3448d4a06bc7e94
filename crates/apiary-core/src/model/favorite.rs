//! Favorited endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::endpoint::{EndpointKey, HttpMethod};
use super::snapshot::EndpointSnapshot;
use crate::namespace::RegistryKind;
use crate::persistence::{timestamp_sort_key, Record, RecordId};

/// Display data stored with a favorite
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavoriteMeta {
    pub title: String,
    pub tag_name: String,
    pub endpoint_snapshot: EndpointSnapshot,
}

impl FavoriteMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn tag(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    pub fn snapshot(mut self, snapshot: impl Into<EndpointSnapshot>) -> Self {
        self.endpoint_snapshot = snapshot.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: RecordId,
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tag_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub endpoint_snapshot: EndpointSnapshot,
}

impl FavoriteRecord {
    pub fn new(key: EndpointKey, meta: FavoriteMeta, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: key.path,
            method: key.method,
            title: meta.title,
            tag_name: meta.tag_name,
            created_at: now,
            endpoint_snapshot: meta.endpoint_snapshot,
        }
    }

    pub fn endpoint(&self) -> EndpointKey {
        EndpointKey::new(self.path.clone(), self.method)
    }

    pub fn matches(&self, key: &EndpointKey) -> bool {
        self.path == key.path && self.method == key.method
    }
}

impl Record for FavoriteRecord {
    const KIND: RegistryKind = RegistryKind::Favorites;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        timestamp_sort_key(&self.created_at)
    }

    fn endpoint_key(&self) -> Option<EndpointKey> {
        Some(self.endpoint())
    }
}
