//! Metrics collection for the gateway
//!
//! Thread-safe counters using atomic operations, sampled into the
//! `/status` document.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for the gateway
///
/// All operations are thread-safe using atomic operations.
#[derive(Debug, Default)]
pub struct GateMetrics {
    // Request outcomes
    total_requests: AtomicU64,
    streamed_requests: AtomicU64,
    invalid_hash_rejections: AtomicU64,
    not_found_rejections: AtomicU64,
    transfer_aborts: AtomicU64,

    // Transfer volume
    chunks_fetched: AtomicU64,
    bytes_streamed: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub streamed_requests: u64,
    pub invalid_hash_rejections: u64,
    pub not_found_rejections: u64,
    pub transfer_aborts: u64,
    pub chunks_fetched: u64,
    pub bytes_streamed: u64,
}

impl GateMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an accepted file request
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that reached the streaming state
    pub fn record_streamed(&self) {
        self.streamed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a hash-gate rejection
    pub fn record_invalid_hash(&self) {
        self.invalid_hash_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed message resolution
    pub fn record_not_found(&self) {
        self.not_found_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a stream aborted by a transfer failure
    pub fn record_transfer_abort(&self) {
        self.transfer_aborts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed chunk fetch
    pub fn record_chunk_fetched(&self) {
        self.chunks_fetched.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes handed to the response body
    pub fn record_bytes_streamed(&self, bytes: u64) {
        self.bytes_streamed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters
    ///
    /// Under concurrency the snapshot may not be perfectly consistent
    /// across fields.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            streamed_requests: self.streamed_requests.load(Ordering::Relaxed),
            invalid_hash_rejections: self.invalid_hash_rejections.load(Ordering::Relaxed),
            not_found_rejections: self.not_found_rejections.load(Ordering::Relaxed),
            transfer_aborts: self.transfer_aborts.load(Ordering::Relaxed),
            chunks_fetched: self.chunks_fetched.load(Ordering::Relaxed),
            bytes_streamed: self.bytes_streamed.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero, primarily for tests
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.streamed_requests.store(0, Ordering::Relaxed);
        self.invalid_hash_rejections.store(0, Ordering::Relaxed);
        self.not_found_rejections.store(0, Ordering::Relaxed);
        self.transfer_aborts.store(0, Ordering::Relaxed);
        self.chunks_fetched.store(0, Ordering::Relaxed);
        self.bytes_streamed.store(0, Ordering::Relaxed);
    }
}
