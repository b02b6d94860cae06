use txidx_errors::CoreError;

/// An inclusive block interval `[from_block, to_block]`.
///
/// Construction always validates `from_block <= to_block`; there is no way
/// to build an invalid `BlockRange` except via `Copy`/`Clone` of one that was
/// already valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockRange {
    from_block: u64,
    to_block: u64,
}

impl BlockRange {
    /// Construct a range, validating that `from_block <= to_block`.
    pub fn new(from_block: u64, to_block: u64) -> Result<Self, CoreError> {
        if from_block > to_block {
            return Err(CoreError::InvalidInput(format!(
                "fromBlock ({from_block}) must not be greater than toBlock ({to_block})"
            )));
        }
        Ok(Self { from_block, to_block })
    }

    /// Construct a range without validating the invariant.
    ///
    /// Intended for the coverage engine, which computes endpoints that are
    /// known by construction to satisfy `from <= to`; callers elsewhere
    /// should prefer [`BlockRange::new`].
    pub const fn new_unchecked(from_block: u64, to_block: u64) -> Self {
        Self { from_block, to_block }
    }

    /// The inclusive lower bound.
    pub const fn from_block(&self) -> u64 {
        self.from_block
    }

    /// The inclusive upper bound.
    pub const fn to_block(&self) -> u64 {
        self.to_block
    }

    /// Number of blocks covered by this range, inclusive of both endpoints.
    pub const fn len(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    /// A range never has zero length by construction.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// True if `block` falls within `[from_block, to_block]`.
    pub const fn contains(&self, block: u64) -> bool {
        block >= self.from_block && block <= self.to_block
    }

    /// True if this range and `other` overlap or touch (i.e. their union is
    /// a single contiguous range).
    pub const fn touches_or_overlaps(&self, other: &Self) -> bool {
        self.from_block <= other.to_block.saturating_add(1)
            && other.from_block <= self.to_block.saturating_add(1)
    }

    /// Split this range into consecutive sub-ranges of at most `chunk_size`
    /// blocks each, in ascending order. `chunk_size` of zero produces a
    /// single chunk (there is no meaningful way to split into zero-sized
    /// pieces).
    pub fn split(&self, chunk_size: u64) -> Vec<Self> {
        if chunk_size == 0 {
            return vec![*self];
        }
        let mut out = Vec::new();
        let mut cursor = self.from_block;
        while cursor <= self.to_block {
            let end = cursor.saturating_add(chunk_size - 1).min(self.to_block);
            out.push(Self::new_unchecked(cursor, end));
            if end == self.to_block {
                break;
            }
            cursor = end + 1;
        }
        out
    }
}

/// Validate an optional `(from, to)` pair of block numbers, per the
/// transaction-query constraints: both non-negative (trivially true for
/// `u64`), and `from <= to` when both are given.
pub fn validate_bounds(from: Option<u64>, to: Option<u64>) -> Result<(), CoreError> {
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(CoreError::InvalidInput(format!(
                "from ({f}) must not be greater than to ({t})"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_from_greater_than_to() {
        assert!(BlockRange::new(10, 5).is_err());
    }

    #[test]
    fn accepts_equal_bounds() {
        let r = BlockRange::new(5, 5).unwrap();
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn accepts_max_safe_values() {
        let r = BlockRange::new(0, u64::MAX).unwrap();
        assert_eq!(r.from_block(), 0);
        assert_eq!(r.to_block(), u64::MAX);
    }

    #[test]
    fn split_produces_consecutive_chunks() {
        let r = BlockRange::new(0, 10_999).unwrap();
        let chunks = r.split(5_000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], BlockRange::new(0, 4_999).unwrap());
        assert_eq!(chunks[1], BlockRange::new(5_000, 9_999).unwrap());
        assert_eq!(chunks[2], BlockRange::new(10_000, 10_999).unwrap());
    }

    #[test]
    fn validate_bounds_rejects_from_after_to() {
        assert!(validate_bounds(Some(10), Some(5)).is_err());
        assert!(validate_bounds(Some(5), Some(5)).is_ok());
        assert!(validate_bounds(None, Some(5)).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn split_covers_the_original_range_exactly(from in 0u64..1_000_000, len in 1u64..20_000, chunk in 1u64..6_000) {
            let to = from + len;
            let r = BlockRange::new(from, to).unwrap();
            let chunks = r.split(chunk);
            // chunks are consecutive and exactly cover [from, to]
            let mut cursor = from;
            for c in &chunks {
                proptest::prop_assert_eq!(c.from_block(), cursor);
                proptest::prop_assert!(c.to_block() <= to);
                cursor = c.to_block() + 1;
            }
            proptest::prop_assert_eq!(cursor, to + 1);
        }
    }
}
