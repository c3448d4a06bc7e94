//! Records kept by the registries and the values they are built from

mod endpoint;
mod favorite;
mod history;
mod snapshot;
mod tab;

pub use endpoint::{EndpointKey, HttpMethod, UnknownMethod};
pub use favorite::{FavoriteMeta, FavoriteRecord};
pub use history::{CallRecord, HistoryEntry, RequestSnapshot, ResponseSnapshot};
pub use snapshot::{
    CachedResponse, EndpointDescriptor, EndpointSnapshot, ParameterDescriptor, ParameterLocation,
    ResponseCache, ResponseCacheSnapshot,
};
pub use tab::{ActivePane, TabMeta, TabRecord, TabUpdate};
