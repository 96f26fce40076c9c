pub mod file;
pub mod memory;

pub use file::FileRouteStore;
pub use memory::MemoryRouteStore;

use crate::error::StoreError;
use crate::types::{RouteId, RoutePoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistence seam for route documents.
///
/// `get_route` must return points in exactly the order they were passed to
/// `create_route`. Creation is not idempotent: identical uploads produce
/// distinct documents.
pub trait RouteStore: Send + Sync {
    fn create_route(&self, points: &[RoutePoint]) -> Result<RouteId, StoreError>;

    fn get_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, StoreError>;

    /// All stored ids in ascending order
    fn list_route_ids(&self) -> Result<Vec<RouteId>, StoreError>;
}

/// On-disk / on-wire shape of a stored route
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteDocument {
    #[serde(rename = "dataArray")]
    pub data_array: Vec<RoutePoint>,
}

/// Timestamp-derived id, millisecond resolution, filesystem safe
pub fn timestamp_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%S%.3fZ").to_string()
}

/// Append `-NNNN` to `base` until `taken` no longer reports a collision.
///
/// The suffix is zero-padded so lexical order matches creation order.
pub fn unique_id(base: &str, mut taken: impl FnMut(&str) -> bool) -> RouteId {
    if !taken(base) {
        return RouteId::new(base);
    }

    let mut suffix = 1u32;
    loop {
        let candidate = format!("{}-{:04}", base, suffix);
        if !taken(&candidate) {
            return RouteId::new(candidate);
        }
        suffix += 1;
    }
}

/// Ids double as file names, so only a conservative character set is allowed
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
