// Property tests for the chunk planner
//
// For any byte range and chunk-size bounds, the computed plan must cover
// the range exactly: the trimmed first and last parts land precisely on
// the range edges, the trimmed part lengths sum to the range length, and
// the dynamic chunk size stays a power of two within the configured
// bounds.

use proptest::prelude::*;
use streamgate::models::ByteRange;
use streamgate::planner::ChunkPlanner;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Sum of part lengths after boundary trimming
fn trimmed_length(plan: &streamgate::planner::ChunkPlan) -> u64 {
    if plan.part_count == 1 {
        return plan.last_part_cut - plan.first_part_cut;
    }
    let first = plan.chunk_size - plan.first_part_cut;
    let middle = (plan.part_count - 2) * plan.chunk_size;
    first + middle + plan.last_part_cut
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// The plan's chunks cover the requested range exactly: the first
    /// trimmed byte is `range.start`, the last is `range.end`, and the
    /// trimmed lengths sum to the range length.
    #[test]
    fn prop_plan_covers_range_exactly(
        start in 0u64..=10_000_000_000u64,
        len in 1u64..=4_000_000_000u64,
    ) {
        let range = ByteRange::new(start, start + len - 1).unwrap();
        let planner = ChunkPlanner::new(MIB, 2 * MIB);
        let plan = planner.plan(range);

        // First trimmed byte of the first chunk is range.start
        prop_assert_eq!(
            plan.chunk_offset * plan.chunk_size + plan.first_part_cut,
            range.start
        );

        // Last trimmed byte of the last chunk is range.end
        let last_chunk = plan.chunk_offset + plan.part_count - 1;
        prop_assert_eq!(
            last_chunk * plan.chunk_size + plan.last_part_cut - 1,
            range.end
        );

        prop_assert_eq!(trimmed_length(&plan), range.size());
    }

    /// `part_count` equals the number of distinct chunk indices the range
    /// touches, and every cut stays within a chunk.
    #[test]
    fn prop_part_count_matches_touched_chunks(
        start in 0u64..=1_000_000_000u64,
        len in 1u64..=100_000_000u64,
        chunk_pow in 16u32..=21u32,
    ) {
        let chunk_size = 1u64 << chunk_pow;
        let range = ByteRange::new(start, start + len - 1).unwrap();
        let planner = ChunkPlanner::new(chunk_size, chunk_size);
        let plan = planner.plan_with_chunk_size(range, chunk_size);

        let touched = range.end / chunk_size - range.start / chunk_size + 1;
        prop_assert_eq!(plan.part_count, touched);

        prop_assert!(plan.first_part_cut < chunk_size);
        prop_assert!(plan.last_part_cut >= 1 && plan.last_part_cut <= chunk_size);
        if plan.part_count == 1 {
            prop_assert!(plan.first_part_cut < plan.last_part_cut);
        }
    }

    /// Dynamic sizing picks a power of two within the configured bounds,
    /// and only leaves more than 128 parts when already at the ceiling.
    #[test]
    fn prop_chunk_size_bounds(
        len in 1u64..=20_000_000_000u64,
        floor_pow in 16u32..=20u32,
        extra_pow in 0u32..=4u32,
    ) {
        let floor = 1u64 << floor_pow;
        let ceiling = floor << extra_pow;
        let planner = ChunkPlanner::new(floor, ceiling);
        let chunk_size = planner.chunk_size_for(len);

        prop_assert!(chunk_size >= floor);
        prop_assert!(chunk_size <= ceiling);
        prop_assert!(chunk_size.is_power_of_two());

        // Doubling stops exactly when the aligned part estimate fits,
        // or the ceiling is hit.
        if chunk_size < ceiling {
            prop_assert!(len / chunk_size <= 128);
        }
        if chunk_size > floor {
            prop_assert!(len / (chunk_size / 2) > 128);
        }
    }

    /// Sub-chunk ranges always plan to one or two parts at the floor size
    #[test]
    fn prop_small_ranges_stay_small(
        start in 0u64..=100_000_000u64,
        len in 1u64..=64u64 * KIB,
    ) {
        let range = ByteRange::new(start, start + len - 1).unwrap();
        let planner = ChunkPlanner::new(MIB, 2 * MIB);
        let plan = planner.plan(range);

        prop_assert_eq!(plan.chunk_size, MIB);
        prop_assert!(plan.part_count <= 2);
    }
}
