//! Policy layers over the namespace repositories
//!
//! Reads degrade: a failed read is logged and answered with an empty or
//! default value, so rendering never has to special-case a broken store.
//! The cost is that a broken store looks exactly like an empty one; callers
//! that must tell the two apart use the `try_*` reads. Writes always
//! surface their error.

mod favorites;
mod history;
mod tabs;

pub use favorites::FavoritesRegistry;
pub use history::HistoryLog;
pub use tabs::TabRegistry;

use crate::error::Result;
use crate::namespace::RegistryKind;

fn degrade<T>(kind: RegistryKind, operation: &'static str, result: Result<T>, fallback: T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(%kind, operation, error = %e, "Read failed, returning default");
            fallback
        }
    }
}
