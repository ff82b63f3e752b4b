//! Backing transfer seams
//!
//! The remote file-chunk protocol and the message metadata lookup are
//! external collaborators; the gateway consumes them only through these
//! traits. Implementations must be callable concurrently across handles
//! on the same client; each stream calls sequentially.

use crate::error::Result;
use crate::models::{FileHandle, FileMeta};
use async_trait::async_trait;
use bytes::Bytes;

/// Fetches whole aligned chunks of a remote file
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Fetch chunk `chunk_index` of the file, where chunk `i` covers
    /// bytes `[i * chunk_size, (i + 1) * chunk_size)`.
    ///
    /// Returns `None` when the index is at or past end-of-data; a final
    /// chunk may come back shorter than `chunk_size`. Both are normal
    /// EOF signals, not errors.
    async fn fetch_chunk(
        &self,
        handle: &FileHandle,
        chunk_index: u64,
        chunk_size: u64,
    ) -> Result<Option<Bytes>>;
}

/// Resolves a channel message into transferable file metadata
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Look up the file attached to `(channel_id, message_id)`.
    ///
    /// Fails with `FileNotFound` when the message no longer exists or
    /// carries no transferable media.
    async fn resolve_message(&self, channel_id: i64, message_id: i64) -> Result<FileMeta>;
}

/// Full capability of one backing client connection
pub trait Transport: ChunkSource + MessageSource {}

impl<T: ChunkSource + MessageSource> Transport for T {}
