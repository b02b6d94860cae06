//! Gap-finding and interval-merging over per-address coverage ranges.
//!
//! This crate is the single source of truth for "what transaction data is
//! still missing". It contains no I/O: every function here is a pure
//! transformation over `BlockRange` values, which makes it the easiest part
//! of the system to property-test exhaustively.
//!
//! # Example: gap detection
//!
//! ```
//! use txidx_coverage::find_gaps;
//! use txidx_types::BlockRange;
//!
//! let covered = vec![BlockRange::new(100, 200).unwrap(), BlockRange::new(300, 400).unwrap()];
//! let gaps = find_gaps(&covered, 50, 500);
//!
//! assert_eq!(
//!     gaps,
//!     vec![
//!         BlockRange::new(50, 99).unwrap(),
//!         BlockRange::new(201, 299).unwrap(),
//!         BlockRange::new(401, 500).unwrap(),
//!     ]
//! );
//! ```

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

use txidx_types::BlockRange;

/// Compute the maximal sub-intervals of `[lo, hi]` not contained in the
/// union of `ranges`.
///
/// `ranges` may be unsorted, overlapping, or extend outside `[lo, hi]` --
/// all of those are normal inputs, not error conditions. If `lo > hi` the
/// result is always empty (there is nothing to request).
///
/// Returned gaps are pairwise disjoint and ordered by `from_block`, and
/// each is maximal: extending either endpoint by one block would make it
/// overlap a covered range or leave `[lo, hi]`.
pub fn find_gaps(ranges: &[BlockRange], lo: u64, hi: u64) -> Vec<BlockRange> {
    if lo > hi {
        return Vec::new();
    }

    let mut sorted: Vec<BlockRange> = ranges.to_vec();
    sorted.sort_by_key(|r| r.from_block());

    let mut gaps = Vec::new();
    let mut cursor = lo;

    for range in &sorted {
        let (f, t) = (range.from_block(), range.to_block());

        if cursor > hi {
            break;
        }

        if cursor < f {
            let gap_end = f.saturating_sub(1).min(hi);
            if cursor <= gap_end {
                gaps.push(BlockRange::new_unchecked(cursor, gap_end));
            }
        }

        cursor = cursor.max(t.saturating_add(1));
    }

    if cursor <= hi {
        gaps.push(BlockRange::new_unchecked(cursor, hi));
    }

    gaps
}

/// Merge touching or overlapping ranges into the minimal row-set whose
/// union equals the input's union.
///
/// This is a pure compaction transform, never invoked on the write path
/// (coverage rows stay append-only); it exists for an optional, out-of-band
/// periodic compaction job. Running it twice in a row is a no-op: the
/// second pass returns the same rows as the first.
pub fn merge_coverage(ranges: &[BlockRange]) -> Vec<BlockRange> {
    if ranges.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<BlockRange> = ranges.to_vec();
    sorted.sort_by_key(|r| r.from_block());

    let mut merged: Vec<BlockRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if last.touches_or_overlaps(&range) => {
                let new_to = last.to_block().max(range.to_block());
                *last = BlockRange::new_unchecked(last.from_block(), new_to);
            }
            _ => merged.push(range),
        }
    }
    merged
}
