//! Application name → store namespace resolution
//!
//! Every registry kind gets its own namespace for the same application, so
//! the tab, history, and favorites stores never share a database.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// The three record collections kept per application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryKind {
    Tabs,
    History,
    Favorites,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 3] = [
        RegistryKind::Tabs,
        RegistryKind::History,
        RegistryKind::Favorites,
    ];

    /// Suffix appended to the application slug. `_` never occurs in a slug.
    pub fn suffix(&self) -> &'static str {
        match self {
            RegistryKind::Tabs => "_tabs",
            RegistryKind::History => "_history",
            RegistryKind::Favorites => "_favorites",
        }
    }

    /// Table holding this kind's records
    pub fn table(&self) -> &'static str {
        match self {
            RegistryKind::Tabs => "tabs",
            RegistryKind::History => "history",
            RegistryKind::Favorites => "favorites",
        }
    }

    /// Name of the field the `sort_key` column indexes
    pub fn sort_field(&self) -> &'static str {
        match self {
            RegistryKind::Tabs => "order",
            RegistryKind::History => "timestamp",
            RegistryKind::Favorites => "created_at",
        }
    }

    /// Whether (path, method) must be unique within the collection
    pub fn unique_endpoints(&self) -> bool {
        matches!(self, RegistryKind::Tabs | RegistryKind::Favorites)
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Canonical identifier of one isolated store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: String,
    kind: RegistryKind,
}

impl Namespace {
    /// Resolve the namespace of `kind` for an application name.
    ///
    /// Names that slugify to nothing (empty, whitespace, all symbols) are
    /// rejected rather than mapped onto a shared fallback store.
    pub fn resolve(application_name: &str, kind: RegistryKind) -> Result<Self> {
        let slug = slugify(application_name);
        if slug.is_empty() {
            return Err(StoreError::InvalidNamespace(format!(
                "application name {:?} contains no letters or digits",
                application_name
            )));
        }
        Ok(Self {
            id: format!("{}{}", slug, kind.suffix()),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> RegistryKind {
        self.kind
    }

    /// File name of the namespace's database inside the data directory
    pub fn file_name(&self) -> String {
        format!("{}.sqlite3", self.id)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Lowercase, map everything outside `[a-z0-9]` to `-`, collapse runs of
/// `-`, and trim them from both ends.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Pet Store API"), "pet-store-api");
        assert_eq!(slugify("  --Billing__v2!!  "), "billing-v2");
        assert_eq!(slugify("a...b"), "a-b");
        assert_eq!(slugify("ÜberAPI"), "berapi");
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("%%%"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for name in ["Pet Store", "x--y", "-lead", "trail-", "MiXeD 42"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn test_kinds_never_collide() {
        let ids: Vec<String> = RegistryKind::ALL
            .iter()
            .map(|k| Namespace::resolve("Pet Store", *k).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["pet-store_tabs", "pet-store_history", "pet-store_favorites"]);
    }

    #[test]
    fn test_empty_slug_is_rejected() {
        let err = Namespace::resolve("  !!! ", RegistryKind::Tabs).unwrap_err();
        assert!(matches!(err, StoreError::InvalidNamespace(_)));
    }

    #[test]
    fn test_same_name_same_namespace() {
        let a = Namespace::resolve("Orders", RegistryKind::History).unwrap();
        let b = Namespace::resolve("orders", RegistryKind::History).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.file_name(), "orders_history.sqlite3");
    }
}
