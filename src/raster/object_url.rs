use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const SCHEME_PREFIX: &str = "blob:prescription/";

/// Opaque in-process handle to artifact bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn id(&self) -> Option<Uuid> {
        self.0
            .strip_prefix(SCHEME_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry {
    content_type: String,
    bytes: Arc<[u8]>,
}

/// Keeps artifact bytes reachable by URL until revoked
#[derive(Default)]
pub struct ObjectUrlRegistry {
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl std::fmt::Debug for ObjectUrlRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectUrlRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Arc<[u8]>, content_type: &str) -> ObjectUrl {
        let id = Uuid::new_v4();
        self.entries.lock().insert(
            id,
            Entry {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        debug!("Object URL created: {}{}", SCHEME_PREFIX, id);
        ObjectUrl(format!("{}{}", SCHEME_PREFIX, id))
    }

    /// Content type and bytes behind a live URL
    pub fn resolve(&self, url: &ObjectUrl) -> Option<(String, Arc<[u8]>)> {
        let id = url.id()?;
        self.entries
            .lock()
            .get(&id)
            .map(|entry| (entry.content_type.clone(), Arc::clone(&entry.bytes)))
    }

    /// Release a URL. Returns false if it was unknown or already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = url
            .id()
            .is_some_and(|id| self.entries.lock().remove(&id).is_some());
        if removed {
            debug!("Object URL revoked: {}", url);
        } else {
            warn!("Revoking unknown object URL: {}", url);
        }
        removed
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}
