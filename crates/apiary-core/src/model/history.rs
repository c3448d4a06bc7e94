//! Call history entries

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::endpoint::{EndpointKey, HttpMethod};
use crate::namespace::RegistryKind;
use crate::persistence::{timestamp_sort_key, Record, RecordId};

/// The request half of a completed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestSnapshot {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub query_params: BTreeMap<String, String>,
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// The response half of a completed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResponseSnapshot {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// A completed call as handed over by the caller.
///
/// `timestamp` defaults to the time of appending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub path: String,
    pub method: HttpMethod,
    pub timestamp: Option<DateTime<Utc>>,
    pub request: RequestSnapshot,
    pub response: ResponseSnapshot,
}

impl CallRecord {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            timestamp: None,
            request: RequestSnapshot::default(),
            response: ResponseSnapshot::default(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn request(mut self, request: RequestSnapshot) -> Self {
        self.request = request;
        self
    }

    pub fn response(mut self, response: ResponseSnapshot) -> Self {
        self.response = response;
        self
    }
}

/// An immutable history entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: RecordId,
    pub path: String,
    pub method: HttpMethod,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub request: RequestSnapshot,
    #[serde(default)]
    pub response: ResponseSnapshot,
}

impl HistoryEntry {
    /// Freeze a call into an entry, stamping it with `now` if it carries
    /// no timestamp of its own.
    pub fn from_call(call: CallRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            path: call.path,
            method: call.method,
            timestamp: call.timestamp.unwrap_or(now),
            request: call.request,
            response: call.response,
        }
    }

    pub fn endpoint(&self) -> EndpointKey {
        EndpointKey::new(self.path.clone(), self.method)
    }
}

impl Record for HistoryEntry {
    const KIND: RegistryKind = RegistryKind::History;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self) -> i64 {
        timestamp_sort_key(&self.timestamp)
    }

    fn endpoint_key(&self) -> Option<EndpointKey> {
        Some(self.endpoint())
    }
}
