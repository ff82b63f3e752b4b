//! Chunk planner
//!
//! Computes which aligned remote chunks must be fetched to satisfy a byte
//! range, and the intra-chunk trims on the first and last chunk. The plan
//! is a pure function of the range and the chunk size, recomputed per
//! request.

use crate::models::ByteRange;
use tracing::debug;

/// Doubling trigger for dynamic chunk sizing: while a range would need
/// more than this many parts at the current size, use a bigger chunk
/// (up to the configured ceiling).
const PARTS_PER_DOUBLING: u64 = 128;

/// Fetch plan for one ranged request
///
/// Invariants: `chunk_offset * chunk_size <= range.start` and
/// `range.start < (chunk_offset + 1) * chunk_size`; the backing transfer
/// protocol only serves whole chunks aligned to multiples of `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Chunk size used for this request, in bytes
    pub chunk_size: u64,
    /// Index of the first remote chunk to fetch
    pub chunk_offset: u64,
    /// Bytes to discard from the start of the first fetched chunk
    pub first_part_cut: u64,
    /// Bytes to keep from the start of the last fetched chunk
    pub last_part_cut: u64,
    /// Number of remote chunk fetches to perform
    pub part_count: u64,
}

impl ChunkPlan {
    /// Aligned byte offset of the first fetched chunk within the file
    pub fn byte_offset(&self) -> u64 {
        self.chunk_offset * self.chunk_size
    }
}

/// Calculator for per-request chunk plans
pub struct ChunkPlanner {
    /// Smallest chunk size handed to the transfer layer
    floor: u64,
    /// Largest chunk size handed to the transfer layer
    ceiling: u64,
}

impl ChunkPlanner {
    /// Create a new planner
    ///
    /// Both bounds must be powers of two with `floor <= ceiling`; config
    /// validation enforces this before a planner is built.
    pub fn new(floor: u64, ceiling: u64) -> Self {
        debug_assert!(floor.is_power_of_two() && ceiling.is_power_of_two());
        debug_assert!(floor <= ceiling);
        ChunkPlanner { floor, ceiling }
    }

    /// Pick the chunk size for a request of `range_len` bytes
    ///
    /// Small, seek-heavy requests stay cheap at the floor size; large
    /// transfers double the chunk size (up to the ceiling) to cut
    /// per-chunk round-trip overhead.
    pub fn chunk_size_for(&self, range_len: u64) -> u64 {
        let mut size = self.floor;
        while size < self.ceiling && range_len / size > PARTS_PER_DOUBLING {
            size *= 2;
        }
        size
    }

    /// Compute the fetch plan for a byte range
    ///
    /// The part count is the number of distinct aligned chunks the range
    /// touches: `end/chunk_size - start/chunk_size + 1`.
    pub fn plan(&self, range: ByteRange) -> ChunkPlan {
        let chunk_size = self.chunk_size_for(range.size());
        self.plan_with_chunk_size(range, chunk_size)
    }

    /// Compute the fetch plan for a byte range at a fixed chunk size
    pub fn plan_with_chunk_size(&self, range: ByteRange, chunk_size: u64) -> ChunkPlan {
        let first_chunk = range.start / chunk_size;
        let last_chunk = range.end / chunk_size;

        let plan = ChunkPlan {
            chunk_size,
            chunk_offset: first_chunk,
            first_part_cut: range.start % chunk_size,
            last_part_cut: range.end % chunk_size + 1,
            part_count: last_chunk - first_chunk + 1,
        };

        debug!(
            "Planned {} part(s) for range {}-{} (chunk_size={}, offset={})",
            plan.part_count, range.start, range.end, plan.chunk_size, plan.chunk_offset
        );

        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn planner() -> ChunkPlanner {
        ChunkPlanner::new(MIB, 2 * MIB)
    }

    #[test]
    fn test_single_chunk_containment() {
        // Range [0, 499] lies entirely within remote chunk 0.
        let plan = planner().plan_with_chunk_size(ByteRange::new(0, 499).unwrap(), MIB);
        assert_eq!(plan.part_count, 1);
        assert_eq!(plan.chunk_offset, 0);
        assert_eq!(plan.first_part_cut, 0);
        assert_eq!(plan.last_part_cut, 500);
    }

    #[test]
    fn test_multi_chunk_boundary() {
        // [1000, 2023] with 1KiB chunks spans chunks 0 and 1: discard the
        // first 1000 bytes of chunk 0, keep the first 1000 bytes of
        // chunk 1, so 24 + 1000 covers the 1024-byte range.
        let planner = ChunkPlanner::new(1024, 1024);
        let plan = planner.plan_with_chunk_size(ByteRange::new(1000, 2023).unwrap(), 1024);
        assert_eq!(plan.part_count, 2);
        assert_eq!(plan.chunk_offset, 0);
        assert_eq!(plan.first_part_cut, 1000);
        assert_eq!(plan.last_part_cut, 1000);
        assert_eq!(
            (plan.chunk_size - plan.first_part_cut) + plan.last_part_cut,
            1024
        );
    }

    #[test]
    fn test_exact_chunk_boundary_needs_second_part() {
        // until == chunk_size means byte 1024 lives in chunk 1.
        let planner = ChunkPlanner::new(1024, 1024);
        let plan = planner.plan_with_chunk_size(ByteRange::new(0, 1024).unwrap(), 1024);
        assert_eq!(plan.part_count, 2);
        assert_eq!(plan.last_part_cut, 1);
    }

    #[test]
    fn test_mid_file_offset_alignment() {
        let plan = planner().plan_with_chunk_size(ByteRange::new(5 * MIB + 7, 9 * MIB).unwrap(), MIB);
        assert_eq!(plan.chunk_offset, 5);
        assert_eq!(plan.byte_offset(), 5 * MIB);
        assert_eq!(plan.first_part_cut, 7);
        // offset * chunk_size <= start < (offset + 1) * chunk_size
        assert!(plan.byte_offset() <= 5 * MIB + 7);
        assert!(5 * MIB + 7 < plan.byte_offset() + plan.chunk_size);
    }

    #[test]
    fn test_trimmed_lengths_reconstruct_range() {
        let range = ByteRange::new(1000, 2023).unwrap();
        let planner = ChunkPlanner::new(1024, 1024);
        let plan = planner.plan_with_chunk_size(range, 1024);

        // first part contributes chunk_size - first_cut, last part
        // contributes last_cut, middles a full chunk each.
        let total = if plan.part_count == 1 {
            plan.last_part_cut - plan.first_part_cut
        } else {
            (plan.chunk_size - plan.first_part_cut)
                + (plan.part_count - 2) * plan.chunk_size
                + plan.last_part_cut
        };
        assert_eq!(total, range.size());
    }

    #[test]
    fn test_dynamic_chunk_size_floor_for_small_ranges() {
        let planner = planner();
        assert_eq!(planner.chunk_size_for(1), MIB);
        assert_eq!(planner.chunk_size_for(64 * MIB), MIB);
        assert_eq!(planner.chunk_size_for(128 * MIB), MIB);
    }

    #[test]
    fn test_dynamic_chunk_size_ceiling_for_large_ranges() {
        let planner = planner();
        assert_eq!(planner.chunk_size_for(129 * MIB), 2 * MIB);
        assert_eq!(planner.chunk_size_for(10_000 * MIB), 2 * MIB);
    }

    #[test]
    fn test_fixed_bounds_never_resize() {
        let planner = ChunkPlanner::new(MIB, MIB);
        assert_eq!(planner.chunk_size_for(u64::MAX / 2), MIB);
    }
}
