//! Link endpoint registry
//!
//! Maps opaque `LinkEndpointId`s to endpoints so upper layers can address
//! them. Ids are handed out sequentially from 1 and never reused, so a
//! stale id can only miss, never alias a newer endpoint.

use linkio_core::error::{LinkError, LinkResult};
use linkio_core::id::LinkEndpointId;
use linkio_core::traits::LinkEndpoint;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub struct LinkEndpointRegistry {
    next_id: AtomicU32,
    endpoints: RwLock<HashMap<LinkEndpointId, Arc<dyn LinkEndpoint>>>,
}

impl LinkEndpointRegistry {
    pub fn new() -> Self {
        LinkEndpointRegistry {
            next_id: AtomicU32::new(1),
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Reserve the next id without registering anything yet
    ///
    /// Endpoints that need their own id at construction reserve it first
    /// and `insert` themselves once built.
    pub fn reserve(&self) -> LinkEndpointId {
        LinkEndpointId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register `endpoint` under a reserved id
    pub fn insert(&self, id: LinkEndpointId, endpoint: Arc<dyn LinkEndpoint>) {
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, endpoint);
    }

    /// Register `endpoint` under a fresh id
    pub fn register(&self, endpoint: Arc<dyn LinkEndpoint>) -> LinkEndpointId {
        let id = self.reserve();
        self.insert(id, endpoint);
        id
    }

    pub fn get(&self, id: LinkEndpointId) -> Option<Arc<dyn LinkEndpoint>> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    pub fn unregister(&self, id: LinkEndpointId) -> LinkResult<Arc<dyn LinkEndpoint>> {
        self.endpoints
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .ok_or(LinkError::NotFound)
    }

    /// Registered ids, ascending
    pub fn ids(&self) -> Vec<LinkEndpointId> {
        let mut ids: Vec<_> = self
            .endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LinkEndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinkEndpointRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkEndpointRegistry")
            .field("endpoints", &self.len())
            .finish()
    }
}
