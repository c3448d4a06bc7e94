//! Versioned snapshots of endpoint documentation and cached responses
//!
//! Snapshots are stored inside tab and favorite records. Each one carries a
//! `schema` tag so a later layout is added as a new variant instead of being
//! read back through the old one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a parameter is carried in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    #[default]
    Query,
    Path,
    Header,
    Cookie,
}

/// A documented operation parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ParameterDescriptor {
    pub name: String,
    #[serde(default)]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    /// JSON Schema fragment for the parameter value
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

/// Documentation of one endpoint as seen when the record was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EndpointDescriptor {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDescriptor>,
    /// JSON Schema fragment for the request body
    #[serde(default)]
    pub request_body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum EndpointSnapshot {
    #[serde(rename = "endpoint/v1")]
    V1(EndpointDescriptor),
}

impl EndpointSnapshot {
    pub fn descriptor(&self) -> &EndpointDescriptor {
        match self {
            EndpointSnapshot::V1(d) => d,
        }
    }
}

impl Default for EndpointSnapshot {
    fn default() -> Self {
        EndpointSnapshot::V1(EndpointDescriptor::default())
    }
}

impl From<EndpointDescriptor> for EndpointSnapshot {
    fn from(descriptor: EndpointDescriptor) -> Self {
        EndpointSnapshot::V1(descriptor)
    }
}

/// A documented response, cached for the response pane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CachedResponse {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub example: Option<serde_json::Value>,
}

/// Responses keyed by status code ("200", "404", "default")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ResponseCache {
    #[serde(default)]
    pub responses: BTreeMap<String, CachedResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum ResponseCacheSnapshot {
    #[serde(rename = "responses/v1")]
    V1(ResponseCache),
}

impl ResponseCacheSnapshot {
    pub fn cache(&self) -> &ResponseCache {
        match self {
            ResponseCacheSnapshot::V1(c) => c,
        }
    }

    /// Whether a response with the given status code is cached.
    pub fn contains(&self, code: &str) -> bool {
        self.cache().responses.contains_key(code)
    }
}

impl Default for ResponseCacheSnapshot {
    fn default() -> Self {
        ResponseCacheSnapshot::V1(ResponseCache::default())
    }
}

impl From<ResponseCache> for ResponseCacheSnapshot {
    fn from(cache: ResponseCache) -> Self {
        ResponseCacheSnapshot::V1(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_snapshot_is_tagged() {
        let snapshot = EndpointSnapshot::from(EndpointDescriptor {
            summary: Some("List pets".into()),
            tags: vec!["pets".into()],
            ..Default::default()
        });
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["schema"], "endpoint/v1");
        assert_eq!(json["summary"], "List pets");
    }

    #[test]
    fn test_missing_fields_default() {
        let snapshot: EndpointSnapshot =
            serde_json::from_str(r#"{"schema":"endpoint/v1","summary":"Get pet"}"#).unwrap();
        let d = snapshot.descriptor();
        assert_eq!(d.summary.as_deref(), Some("Get pet"));
        assert!(d.parameters.is_empty());
        assert!(!d.deprecated);
    }

    #[test]
    fn test_unknown_schema_tag_is_rejected() {
        let result: Result<EndpointSnapshot, _> =
            serde_json::from_str(r#"{"schema":"endpoint/v9","summary":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_response_cache_lookup() {
        let mut cache = ResponseCache::default();
        cache.responses.insert(
            "200".into(),
            CachedResponse {
                description: Some("OK".into()),
                ..Default::default()
            },
        );
        let snapshot = ResponseCacheSnapshot::from(cache);
        assert!(snapshot.contains("200"));
        assert!(!snapshot.contains("404"));
    }
}
