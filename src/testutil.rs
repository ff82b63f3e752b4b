//! Test doubles for the transfer seams

use crate::error::{GateError, Result};
use crate::models::{FileHandle, FileMeta};
use crate::transfer::{ChunkSource, MessageSource};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transport that resolves nothing and serves nothing
pub struct NullTransport;

#[async_trait]
impl ChunkSource for NullTransport {
    async fn fetch_chunk(&self, _: &FileHandle, _: u64, _: u64) -> Result<Option<Bytes>> {
        Ok(None)
    }
}

#[async_trait]
impl MessageSource for NullTransport {
    async fn resolve_message(&self, _: i64, message_id: i64) -> Result<FileMeta> {
        Err(GateError::FileNotFound(format!("message {}", message_id)))
    }
}

/// Transport that counts metadata resolutions
pub struct CountingTransport {
    file_size: u64,
    resolutions: AtomicU64,
}

impl CountingTransport {
    pub fn new(file_size: u64) -> Self {
        CountingTransport {
            file_size,
            resolutions: AtomicU64::new(0),
        }
    }

    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChunkSource for CountingTransport {
    async fn fetch_chunk(&self, _: &FileHandle, _: u64, _: u64) -> Result<Option<Bytes>> {
        Ok(None)
    }
}

#[async_trait]
impl MessageSource for CountingTransport {
    async fn resolve_message(&self, _: i64, message_id: i64) -> Result<FileMeta> {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        Ok(FileMeta {
            unique_id: format!("uid{:08}", message_id),
            file_size: self.file_size,
            mime_type: None,
            file_name: None,
        })
    }
}

/// Transport serving a fixed in-memory file, with optional fault injection
pub struct MemoryTransport {
    content: Bytes,
    fetches: AtomicU64,
    /// Fail the fetch of this chunk index with a `TransferError`
    fail_at: Option<u64>,
    /// Report EOF (`None`) once this many fetches have completed
    eof_after: Option<u64>,
}

impl MemoryTransport {
    pub fn new(content: impl Into<Bytes>) -> Self {
        MemoryTransport {
            content: content.into(),
            fetches: AtomicU64::new(0),
            fail_at: None,
            eof_after: None,
        }
    }

    pub fn failing_at(mut self, chunk_index: u64) -> Self {
        self.fail_at = Some(chunk_index);
        self
    }

    pub fn eof_after(mut self, fetches: u64) -> Self {
        self.eof_after = Some(fetches);
        self
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

#[async_trait]
impl ChunkSource for MemoryTransport {
    async fn fetch_chunk(
        &self,
        _handle: &FileHandle,
        chunk_index: u64,
        chunk_size: u64,
    ) -> Result<Option<Bytes>> {
        if let Some(limit) = self.eof_after {
            if self.fetches.load(Ordering::Relaxed) >= limit {
                return Ok(None);
            }
        }
        if self.fail_at == Some(chunk_index) {
            return Err(GateError::transfer(chunk_index, "injected failure"));
        }
        self.fetches.fetch_add(1, Ordering::Relaxed);

        let start = (chunk_index * chunk_size) as usize;
        if start >= self.content.len() {
            return Ok(None);
        }
        let end = std::cmp::min(start + chunk_size as usize, self.content.len());
        Ok(Some(self.content.slice(start..end)))
    }
}

#[async_trait]
impl MessageSource for MemoryTransport {
    async fn resolve_message(&self, _: i64, message_id: i64) -> Result<FileMeta> {
        Ok(FileMeta {
            unique_id: format!("memuid{:06}", message_id),
            file_size: self.content.len() as u64,
            mime_type: Some("application/octet-stream".to_string()),
            file_name: Some(format!("message-{}.bin", message_id)),
        })
    }
}

/// Deterministic pseudo-random content for round-trip checks
pub fn patterned_content(len: usize) -> Bytes {
    let mut data = Vec::with_capacity(len);
    let mut state = 0x9e37u16;
    for _ in 0..len {
        state = state.wrapping_mul(31).wrapping_add(17);
        data.push((state >> 8) as u8);
    }
    Bytes::from(data)
}
