//! Open endpoint tabs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::endpoint::EndpointKey;
use super::snapshot::{EndpointSnapshot, ResponseCacheSnapshot};
use crate::namespace::RegistryKind;
use crate::persistence::{Record, RecordId};

/// Which pane of the tab the user last looked at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivePane {
    #[default]
    Documentation,
    Playground,
    Responses,
}

/// Everything about a tab besides its identity and position
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabMeta {
    pub endpoint_snapshot: EndpointSnapshot,
    pub response_cache: ResponseCacheSnapshot,
    pub selected_response_code: Option<String>,
    pub active_pane: ActivePane,
}

impl TabMeta {
    pub fn with_snapshot(endpoint_snapshot: impl Into<EndpointSnapshot>) -> Self {
        Self {
            endpoint_snapshot: endpoint_snapshot.into(),
            ..Default::default()
        }
    }
}

/// A persisted tab.
///
/// There is no "active" flag: the active tab is the one with the greatest
/// `last_accessed_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub order: u32,
    pub endpoint: EndpointKey,
    #[serde(default)]
    pub endpoint_snapshot: EndpointSnapshot,
    #[serde(default)]
    pub response_cache: ResponseCacheSnapshot,
    #[serde(default)]
    pub selected_response_code: Option<String>,
    #[serde(default)]
    pub active_pane: ActivePane,
}

impl TabRecord {
    pub fn new(endpoint: EndpointKey, meta: TabMeta, order: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_accessed_at: now,
            order,
            endpoint,
            endpoint_snapshot: meta.endpoint_snapshot,
            response_cache: meta.response_cache,
            selected_response_code: meta.selected_response_code,
            active_pane: meta.active_pane,
        }
    }
}

impl Record for TabRecord {
    const KIND: RegistryKind = RegistryKind::Tabs;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        i64::from(self.order)
    }

    fn endpoint_key(&self) -> Option<EndpointKey> {
        Some(self.endpoint.clone())
    }
}

/// Partial update of a tab's interaction state.
///
/// Applying an update does not make the tab active.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabUpdate {
    pub selected_response_code: Option<Option<String>>,
    pub active_pane: Option<ActivePane>,
    pub response_cache: Option<ResponseCacheSnapshot>,
    pub endpoint_snapshot: Option<EndpointSnapshot>,
}

impl TabUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_response(mut self, code: impl Into<String>) -> Self {
        self.selected_response_code = Some(Some(code.into()));
        self
    }

    pub fn clear_response_selection(mut self) -> Self {
        self.selected_response_code = Some(None);
        self
    }

    pub fn pane(mut self, pane: ActivePane) -> Self {
        self.active_pane = Some(pane);
        self
    }

    pub fn response_cache(mut self, cache: impl Into<ResponseCacheSnapshot>) -> Self {
        self.response_cache = Some(cache.into());
        self
    }

    pub fn endpoint_snapshot(mut self, snapshot: impl Into<EndpointSnapshot>) -> Self {
        self.endpoint_snapshot = Some(snapshot.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(self, tab: &mut TabRecord) {
        if let Some(code) = self.selected_response_code {
            tab.selected_response_code = code;
        }
        if let Some(pane) = self.active_pane {
            tab.active_pane = pane;
        }
        if let Some(cache) = self.response_cache {
            tab.response_cache = cache;
        }
        if let Some(snapshot) = self.endpoint_snapshot {
            tab.endpoint_snapshot = snapshot;
        }
    }
}
