use super::{timestamp_id, unique_id, RouteStore};
use crate::error::StoreError;
use crate::types::{RouteId, RoutePoint};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Volatile store, lifetime = process lifetime
#[derive(Default)]
pub struct MemoryRouteStore {
    routes: Mutex<BTreeMap<RouteId, Vec<RoutePoint>>>,
}

impl MemoryRouteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RouteStore for MemoryRouteStore {
    fn create_route(&self, points: &[RoutePoint]) -> Result<RouteId, StoreError> {
        let mut routes = self.routes.lock().map_err(|_| StoreError::Poisoned)?;

        let base = timestamp_id(Utc::now());
        let id = unique_id(&base, |candidate| routes.contains_key(&RouteId::from(candidate)));
        routes.insert(id.clone(), points.to_vec());

        Ok(id)
    }

    fn get_route(&self, id: &RouteId) -> Result<Vec<RoutePoint>, StoreError> {
        let routes = self.routes.lock().map_err(|_| StoreError::Poisoned)?;
        routes
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn list_route_ids(&self) -> Result<Vec<RouteId>, StoreError> {
        let routes = self.routes.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(routes.keys().cloned().collect())
    }
}
