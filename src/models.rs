//! Core data models for the streaming gateway

use crate::error::{GateError, Result};
use serde::{Deserialize, Serialize};

/// Represents an inclusive byte range of an HTTP resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// Starting byte position (inclusive)
    pub start: u64,
    /// Ending byte position (inclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a new ByteRange
    ///
    /// # Returns
    /// * `Ok(ByteRange)` if the range is valid
    /// * `Err(GateError)` if start > end
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(GateError::InvalidRange(format!(
                "start ({}) must be <= end ({})",
                start, end
            )));
        }
        Ok(ByteRange { start, end })
    }

    /// Whole-file range for a file of `file_size` bytes
    ///
    /// `file_size` must be non-zero.
    pub fn full(file_size: u64) -> Self {
        ByteRange {
            start: 0,
            end: file_size.saturating_sub(1),
        }
    }

    /// Get the size of this byte range in bytes
    pub fn size(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Parse a `Range` header value against a known file size
    ///
    /// Accepts the single-range forms `bytes=a-b`, `bytes=a-` and the
    /// suffix form `bytes=-n`. The end position is clamped to
    /// `file_size - 1`. Multi-range requests are unsupported and reported
    /// as malformed; callers fall back to whole-file semantics for
    /// `MalformedRange`, matching the tolerant behavior media players
    /// depend on.
    ///
    /// # Errors
    /// * `MalformedRange` for unparseable syntax or multi-range
    /// * `InvalidRange` when the range lies entirely beyond the file
    pub fn from_header(header: &str, file_size: u64) -> Result<Self> {
        let header = header.trim();

        let spec = header
            .strip_prefix("bytes=")
            .ok_or_else(|| GateError::MalformedRange(format!("missing bytes= prefix: {}", header)))?;

        if spec.contains(',') {
            return Err(GateError::MalformedRange(format!(
                "multi-range not supported: {}",
                spec
            )));
        }

        let (start_s, end_s) = spec
            .split_once('-')
            .ok_or_else(|| GateError::MalformedRange(format!("missing '-' separator: {}", spec)))?;

        if file_size == 0 {
            return Err(GateError::InvalidRange("file is empty".to_string()));
        }
        let last = file_size - 1;

        if start_s.is_empty() {
            // Suffix form: the final n bytes of the file.
            let suffix: u64 = end_s
                .trim()
                .parse()
                .map_err(|e| GateError::MalformedRange(format!("invalid suffix length: {}", e)))?;
            if suffix == 0 {
                return Err(GateError::InvalidRange("zero-length suffix".to_string()));
            }
            let start = file_size.saturating_sub(suffix);
            return ByteRange::new(start, last);
        }

        let start: u64 = start_s
            .trim()
            .parse()
            .map_err(|e| GateError::MalformedRange(format!("invalid start value: {}", e)))?;
        if start > last {
            return Err(GateError::InvalidRange(format!(
                "start {} is beyond file size {}",
                start, file_size
            )));
        }

        let end = if end_s.trim().is_empty() {
            last
        } else {
            let end: u64 = end_s
                .trim()
                .parse()
                .map_err(|e| GateError::MalformedRange(format!("invalid end value: {}", e)))?;
            std::cmp::min(end, last)
        };

        ByteRange::new(start, end)
    }

    /// Format as a `Content-Range` header value
    pub fn to_content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Metadata returned by the backing message lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMeta {
    /// Content-derived unique id of the file
    pub unique_id: String,
    /// Total size of the file in bytes, fixed at resolution time
    pub file_size: u64,
    /// Stored mime type, if the backing service recorded one
    pub mime_type: Option<String>,
    /// Stored file name, if any
    pub file_name: Option<String>,
}

/// Resolved, immutable descriptor of a remote file
///
/// Carries the metadata plus the addressing needed to request arbitrary
/// chunk ranges against the backing client that resolved it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHandle {
    /// Stable index of the backing client this handle was resolved on
    pub client_id: usize,
    /// Channel the message lives in
    pub channel_id: i64,
    /// Message id within the channel
    pub message_id: i64,
    /// File metadata
    pub meta: FileMeta,
}

impl FileHandle {
    /// Total file size in bytes
    pub fn file_size(&self) -> u64 {
        self.meta.file_size
    }

    /// Prefix of the unique id used as the route hash
    pub fn short_hash(&self, len: usize) -> &str {
        let len = std::cmp::min(len, self.meta.unique_id.len());
        &self.meta.unique_id[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_range_new() {
        let range = ByteRange::new(0, 1023).unwrap();
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 1023);
        assert_eq!(range.size(), 1024);
    }

    #[test]
    fn test_byte_range_invalid() {
        assert!(ByteRange::new(100, 50).is_err());
    }

    #[test]
    fn test_full_range() {
        let range = ByteRange::full(10_000);
        assert_eq!(range.start, 0);
        assert_eq!(range.end, 9999);
        assert_eq!(range.size(), 10_000);
    }

    #[test]
    fn test_from_header_closed() {
        let range = ByteRange::from_header("bytes=100-199", 10_000).unwrap();
        assert_eq!(range.start, 100);
        assert_eq!(range.end, 199);
    }

    #[test]
    fn test_from_header_open_end_defaults_to_eof() {
        let range = ByteRange::from_header("bytes=500-", 10_000).unwrap();
        assert_eq!(range.start, 500);
        assert_eq!(range.end, 9999);
    }

    #[test]
    fn test_from_header_suffix() {
        let range = ByteRange::from_header("bytes=-100", 10_000).unwrap();
        assert_eq!(range.start, 9900);
        assert_eq!(range.end, 9999);

        // Suffix longer than the file covers the whole file
        let range = ByteRange::from_header("bytes=-20000", 10_000).unwrap();
        assert_eq!(range.start, 0);
    }

    #[test]
    fn test_from_header_clamps_end() {
        let range = ByteRange::from_header("bytes=0-99999", 10_000).unwrap();
        assert_eq!(range.end, 9999);
    }

    #[test]
    fn test_from_header_malformed() {
        assert!(matches!(
            ByteRange::from_header("octets=0-5", 100),
            Err(GateError::MalformedRange(_))
        ));
        assert!(matches!(
            ByteRange::from_header("bytes=abc-def", 100),
            Err(GateError::MalformedRange(_))
        ));
        assert!(matches!(
            ByteRange::from_header("bytes=0-5,10-15", 100),
            Err(GateError::MalformedRange(_))
        ));
    }

    #[test]
    fn test_from_header_beyond_eof() {
        assert!(matches!(
            ByteRange::from_header("bytes=100-200", 100),
            Err(GateError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_content_range_format() {
        let range = ByteRange::new(100, 199).unwrap();
        assert_eq!(range.to_content_range(10_000), "bytes 100-199/10000");
    }

    #[test]
    fn test_short_hash() {
        let handle = FileHandle {
            client_id: 0,
            channel_id: -100,
            message_id: 42,
            meta: FileMeta {
                unique_id: "AgADcQADJLxYRw".to_string(),
                file_size: 1,
                mime_type: None,
                file_name: None,
            },
        };
        assert_eq!(handle.short_hash(6), "AgADcQ");
        assert_eq!(handle.short_hash(100), "AgADcQADJLxYRw");
    }
}
