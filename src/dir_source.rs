//! Directory-backed transport
//!
//! Serves files laid out as `<root>/<channel_id>/<message_id>[.ext]` as
//! if they were remote chunked messages. This is the stand-in transport
//! used by the binary and the integration tests; the production transport
//! implements the same two traits over the real backing service.

use crate::error::{GateError, Result};
use crate::models::{FileHandle, FileMeta};
use crate::transfer::{ChunkSource, MessageSource};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use xxhash_rust::xxh3::xxh3_128;

/// Transport reading from a local directory tree
pub struct DirSource {
    root: PathBuf,
    /// Resolved message paths, so chunk fetches skip the directory scan
    paths: RwLock<HashMap<(i64, i64), PathBuf>>,
}

impl DirSource {
    /// Create a source over `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirSource {
            root: root.into(),
            paths: RwLock::new(HashMap::new()),
        }
    }

    /// Locate the file stored for `(channel_id, message_id)`
    ///
    /// The file is named by its message id, with any extension.
    async fn locate(&self, channel_id: i64, message_id: i64) -> Result<PathBuf> {
        let key = (channel_id, message_id);
        if let Some(path) = self.paths.read().expect("path lock poisoned").get(&key) {
            return Ok(path.clone());
        }

        let dir = self.root.join(channel_id.to_string());
        let wanted = message_id.to_string();

        let mut entries = fs::read_dir(&dir).await.map_err(|_| {
            GateError::FileNotFound(format!("channel {} has no store", channel_id))
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GateError::IoError(e.to_string()))?
        {
            let path = entry.path();
            let stem = path.file_stem().and_then(|s| s.to_str());
            if stem == Some(wanted.as_str()) && path.is_file() {
                self.paths
                    .write()
                    .expect("path lock poisoned")
                    .insert(key, path.clone());
                return Ok(path);
            }
        }

        Err(GateError::FileNotFound(format!(
            "message {} in channel {}",
            message_id, channel_id
        )))
    }
}

/// Content-derived unique id: xxh3-128 over the file's address and size
fn derive_unique_id(channel_id: i64, message_id: i64, file_size: u64) -> String {
    let mut input = Vec::with_capacity(24);
    input.extend_from_slice(&channel_id.to_le_bytes());
    input.extend_from_slice(&message_id.to_le_bytes());
    input.extend_from_slice(&file_size.to_le_bytes());
    format!("{:032x}", xxh3_128(&input))
}

fn guess_mime(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

#[async_trait]
impl MessageSource for DirSource {
    async fn resolve_message(&self, channel_id: i64, message_id: i64) -> Result<FileMeta> {
        let path = self.locate(channel_id, message_id).await?;
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| GateError::IoError(e.to_string()))?;

        Ok(FileMeta {
            unique_id: derive_unique_id(channel_id, message_id, metadata.len()),
            file_size: metadata.len(),
            mime_type: guess_mime(&path),
            file_name: path
                .file_name()
                .and_then(|n| n.to_str())
                .map(ToOwned::to_owned),
        })
    }
}

#[async_trait]
impl ChunkSource for DirSource {
    async fn fetch_chunk(
        &self,
        handle: &FileHandle,
        chunk_index: u64,
        chunk_size: u64,
    ) -> Result<Option<Bytes>> {
        let path = self.locate(handle.channel_id, handle.message_id).await?;
        let offset = chunk_index * chunk_size;

        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| GateError::transfer(chunk_index, e.to_string()))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| GateError::transfer(chunk_index, e.to_string()))?
            .len();
        if offset >= len {
            return Ok(None);
        }

        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(|e| GateError::transfer(chunk_index, e.to_string()))?;

        let want = std::cmp::min(chunk_size, len - offset) as usize;
        let mut buf = vec![0u8; want];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| GateError::transfer(chunk_index, e.to_string()))?;

        Ok(Some(Bytes::from(buf)))
    }
}
