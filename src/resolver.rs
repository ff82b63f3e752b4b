//! File property resolver
//!
//! Resolves a channel message into a `FileHandle` through a backing
//! client, with a process-wide cache keyed by client identity plus
//! message address. The cache is unbounded at this scale; a lost race on
//! first resolution only causes one harmless duplicate lookup.

use crate::error::Result;
use crate::models::FileHandle;
use crate::pool::BackingClient;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

type CacheKey = (usize, i64, i64);

/// Resolver with the process-wide handle cache
#[derive(Default)]
pub struct FileResolver {
    cache: RwLock<HashMap<CacheKey, Arc<FileHandle>>>,
}

impl FileResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `(channel_id, message_id)` through `client`
    ///
    /// Returns the cached handle when this client has resolved the
    /// message before; otherwise performs the metadata lookup and caches
    /// the result. The returned handle's `file_size` and `unique_id` are
    /// authoritative for the rest of the request.
    pub async fn resolve(
        &self,
        client: &Arc<BackingClient>,
        channel_id: i64,
        message_id: i64,
    ) -> Result<Arc<FileHandle>> {
        let key = (client.id(), channel_id, message_id);

        if let Some(handle) = self.cache.read().expect("cache lock poisoned").get(&key) {
            debug!(
                "Handle cache hit for message {} on client {}",
                message_id,
                client.id()
            );
            return Ok(Arc::clone(handle));
        }

        let meta = client
            .transport()
            .resolve_message(channel_id, message_id)
            .await?;

        debug!(
            "Resolved message {} on client {}: size={}, unique_id={}",
            message_id,
            client.id(),
            meta.file_size,
            meta.unique_id
        );

        let handle = Arc::new(FileHandle {
            client_id: client.id(),
            channel_id,
            message_id,
            meta,
        });

        // Insert-if-absent: a concurrent first resolution keeps whichever
        // handle landed first, and both describe the same file.
        let mut cache = self.cache.write().expect("cache lock poisoned");
        let entry = cache.entry(key).or_insert_with(|| Arc::clone(&handle));
        Ok(Arc::clone(entry))
    }

    /// Number of cached handles, for the status document
    pub fn cached_handles(&self) -> usize {
        self.cache.read().expect("cache lock poisoned").len()
    }
}
