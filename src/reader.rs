//! Chunked range reader
//!
//! Turns a `ChunkPlan` into a lazy, finite, forward-only sequence of byte
//! buffers. Chunks are fetched strictly in increasing offset order, one
//! await at a time; the first and last buffers are trimmed locally so the
//! concatenation equals exactly the requested byte range. The stream owns
//! a `WorkloadGuard`, so dropping it — normal exhaustion, fetch failure
//! or client disconnect — releases the load-balancer accounting exactly
//! once.

use crate::error::{GateError, Result};
use crate::metrics::GateMetrics;
use crate::models::FileHandle;
use crate::planner::ChunkPlan;
use crate::pool::WorkloadGuard;
use async_stream::try_stream;
use bytes::Bytes;
use futures_core::Stream;
use std::sync::Arc;
use tracing::{debug, warn};

/// Build the streaming body for one ranged request
///
/// Yields `part_count` buffers at most; a chunk shorter than
/// `plan.chunk_size` or an empty/absent chunk is the transfer layer's EOF
/// signal and ends the stream early without error. A failed fetch
/// surfaces as an `Err` item, which the HTTP layer turns into an abrupt
/// body termination once headers are out.
pub fn range_stream(
    handle: Arc<FileHandle>,
    plan: ChunkPlan,
    guard: WorkloadGuard,
    metrics: Arc<GateMetrics>,
) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
    try_stream! {
        // The guard lives inside the generator state: every way this
        // stream stops ends with its drop and one workload decrement.
        let guard = guard;
        let transport = Arc::clone(guard.client().transport());

        for part in 0..plan.part_count {
            let chunk_index = plan.chunk_offset + part;

            let fetched = transport
                .fetch_chunk(&handle, chunk_index, plan.chunk_size)
                .await
                .map_err(|e| {
                    warn!(
                        "Chunk {} fetch failed for message {}: {}",
                        chunk_index, handle.message_id, e
                    );
                    metrics.record_transfer_abort();
                    match e {
                        e @ GateError::TransferError { .. } => e,
                        other => GateError::transfer(chunk_index, other.to_string()),
                    }
                })?;

            let chunk = match fetched {
                Some(chunk) if !chunk.is_empty() => chunk,
                // Early end-of-data from the transfer layer: a defined
                // EOF signal, not an error.
                _ => {
                    debug!(
                        "EOF from transfer at part {}/{} (message {})",
                        part, plan.part_count, handle.message_id
                    );
                    break;
                }
            };

            metrics.record_chunk_fetched();
            let chunk_len = chunk.len() as u64;
            let is_first = part == 0;
            let is_last = part == plan.part_count - 1;

            let piece = trim_part(chunk, plan, is_first, is_last);
            if !piece.is_empty() {
                metrics.record_bytes_streamed(piece.len() as u64);
                yield piece;
            }

            // A short chunk is the authoritative end of the file; no
            // further fetch can return data.
            if chunk_len < plan.chunk_size {
                debug!(
                    "Short chunk ({} < {}) at part {}; ending stream",
                    chunk_len, plan.chunk_size, part
                );
                break;
            }
        }
    }
}

/// Apply the first/last intra-chunk trims to one fetched chunk
///
/// The tail trim is skipped when the chunk came back shorter than
/// `last_part_cut`: the natural EOF already trimmed it, and cutting again
/// could drop valid trailing bytes.
fn trim_part(chunk: Bytes, plan: ChunkPlan, is_first: bool, is_last: bool) -> Bytes {
    let len = chunk.len() as u64;

    let start = if is_first {
        std::cmp::min(plan.first_part_cut, len)
    } else {
        0
    };
    let end = if is_last {
        std::cmp::min(plan.last_part_cut, len)
    } else {
        len
    };

    if start >= end {
        return Bytes::new();
    }
    chunk.slice(start as usize..end as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ByteRange;
    use crate::planner::ChunkPlanner;
    use crate::pool::ClientPool;
    use crate::testutil::{patterned_content, MemoryTransport};
    use crate::transfer::Transport;
    use futures_util::StreamExt;

    const CHUNK: u64 = 1024;

    struct Fixture {
        pool: ClientPool,
        content: Bytes,
        metrics: Arc<GateMetrics>,
    }

    fn fixture_with(transport: MemoryTransport) -> Fixture {
        let content = transport.content().clone();
        let pool = ClientPool::new(vec![Arc::new(transport) as Arc<dyn Transport>]).unwrap();
        Fixture {
            pool,
            content,
            metrics: Arc::new(GateMetrics::new()),
        }
    }

    fn fixture(file_size: usize) -> Fixture {
        fixture_with(MemoryTransport::new(patterned_content(file_size)))
    }

    fn handle_for(fx: &Fixture) -> Arc<FileHandle> {
        Arc::new(FileHandle {
            client_id: 0,
            channel_id: -1,
            message_id: 1,
            meta: crate::models::FileMeta {
                unique_id: "testuid0".to_string(),
                file_size: fx.content.len() as u64,
                mime_type: None,
                file_name: None,
            },
        })
    }

    async fn collect(fx: &Fixture, range: ByteRange) -> Result<Vec<u8>> {
        let client = fx.pool.pick_least_loaded();
        let guard = client.begin_transfer();
        let plan = ChunkPlanner::new(CHUNK, CHUNK).plan_with_chunk_size(range, CHUNK);
        let stream = range_stream(handle_for(fx), plan, guard, Arc::clone(&fx.metrics));
        futures_util::pin_mut!(stream);

        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.extend_from_slice(&item?);
        }
        Ok(out)
    }

    #[tokio::test]
    async fn test_round_trip_whole_file() {
        let fx = fixture(10_000);
        let got = collect(&fx, ByteRange::full(10_000)).await.unwrap();
        assert_eq!(got, fx.content.to_vec());
    }

    #[tokio::test]
    async fn test_round_trip_inner_range() {
        let fx = fixture(10_000);
        let got = collect(&fx, ByteRange::new(100, 199).unwrap()).await.unwrap();
        assert_eq!(got, fx.content.slice(100..200).to_vec());
    }

    #[tokio::test]
    async fn test_round_trip_chunk_straddling_range() {
        let fx = fixture(10_000);
        // [1000, 2023] spans chunks 0 and 1 at 1KiB: exactly 1024 bytes.
        let got = collect(&fx, ByteRange::new(1000, 2023).unwrap()).await.unwrap();
        assert_eq!(got.len(), 1024);
        assert_eq!(got, fx.content.slice(1000..2024).to_vec());
    }

    #[tokio::test]
    async fn test_round_trip_exact_chunk_boundaries() {
        let fx = fixture(8192);
        for &(from, until) in &[(0u64, 1023u64), (1024, 2047), (0, 1024), (1023, 1024)] {
            let got = collect(&fx, ByteRange::new(from, until).unwrap()).await.unwrap();
            assert_eq!(
                got,
                fx.content.slice(from as usize..until as usize + 1).to_vec(),
                "range {}-{}",
                from,
                until
            );
        }
    }

    #[tokio::test]
    async fn test_short_final_chunk_not_overtrimmed() {
        // 2500-byte file: chunk 2 is only 452 bytes. Requesting to EOF
        // must keep those trailing bytes intact.
        let fx = fixture(2500);
        let got = collect(&fx, ByteRange::new(2048, 2499).unwrap()).await.unwrap();
        assert_eq!(got, fx.content.slice(2048..2500).to_vec());
    }

    #[tokio::test]
    async fn test_single_fetch_for_contained_range() {
        let fx = fixture(10_000);
        collect(&fx, ByteRange::new(0, 499).unwrap()).await.unwrap();
        assert_eq!(fx.metrics.snapshot().chunks_fetched, 1);
    }

    #[tokio::test]
    async fn test_eof_short_circuit() {
        // Transfer reports EOF after 2 fetches even though the plan wants 4.
        let fx = fixture_with(MemoryTransport::new(patterned_content(4096)).eof_after(2));
        let got = collect(&fx, ByteRange::full(4096)).await.unwrap();
        assert_eq!(got.len(), 2048);
        assert_eq!(fx.metrics.snapshot().chunks_fetched, 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_stream() {
        let fx = fixture_with(MemoryTransport::new(patterned_content(4096)).failing_at(1));
        let err = collect(&fx, ByteRange::full(4096)).await.unwrap_err();
        assert!(matches!(err, GateError::TransferError { chunk_index: 1, .. }));
        assert_eq!(fx.metrics.snapshot().transfer_aborts, 1);
    }

    #[tokio::test]
    async fn test_workload_released_on_completion() {
        let fx = fixture(4096);
        let client = fx.pool.pick_least_loaded();
        collect(&fx, ByteRange::full(4096)).await.unwrap();
        assert_eq!(client.workload(), 0);
    }

    #[tokio::test]
    async fn test_workload_released_on_mid_stream_drop() {
        let fx = fixture(10_000);
        let client = fx.pool.pick_least_loaded();
        {
            let guard = client.begin_transfer();
            let plan = ChunkPlanner::new(CHUNK, CHUNK)
                .plan_with_chunk_size(ByteRange::full(10_000), CHUNK);
            let stream = range_stream(handle_for(&fx), plan, guard, Arc::clone(&fx.metrics));
            futures_util::pin_mut!(stream);
            // Consume a single buffer, then drop the stream mid-flight.
            let first = stream.next().await.unwrap().unwrap();
            assert!(!first.is_empty());
            assert_eq!(client.workload(), 1);
        }
        assert_eq!(client.workload(), 0);
    }
}
