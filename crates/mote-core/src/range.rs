//! Particle index ranges and their SIMD-group-aligned counterparts.
//!
//! [`IndexRange`] is a plain half-open particle range. [`GroupRange`] is a
//! range of whole SIMD groups; it can only be produced by the explicit,
//! outward-rounding [`IndexRange::groups`] conversion, so vectorized
//! accessors taking a [`GroupIndex`] never see an unaligned block.

use std::ops::Range;

use crate::id::{GroupIndex, ParticleId};
use crate::GROUP_STRIDE;

/// Round `n` up to the next multiple of [`GROUP_STRIDE`].
#[inline]
pub const fn align_up(n: u32) -> u32 {
    n.div_ceil(GROUP_STRIDE) * GROUP_STRIDE
}

/// Round `n` down to a multiple of [`GROUP_STRIDE`].
#[inline]
pub const fn align_down(n: u32) -> u32 {
    n / GROUP_STRIDE * GROUP_STRIDE
}

/// Half-open range `[begin, end)` of particle indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IndexRange {
    begin: ParticleId,
    end: ParticleId,
}

impl IndexRange {
    /// Create a range.
    ///
    /// # Panics
    ///
    /// Panics if `begin > end`.
    #[track_caller]
    pub fn new(begin: ParticleId, end: ParticleId) -> Self {
        assert!(begin <= end, "inverted particle range {begin}..{end}");
        Self { begin, end }
    }

    /// An empty range positioned at `at`.
    pub fn empty_at(at: ParticleId) -> Self {
        Self { begin: at, end: at }
    }

    /// First index.
    pub fn begin(&self) -> ParticleId {
        self.begin
    }

    /// One past the last index.
    pub fn end(&self) -> ParticleId {
        self.end
    }

    /// Number of indices.
    pub fn len(&self) -> u32 {
        self.end - self.begin
    }

    /// Whether the range holds no index.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Whether `id` lies inside the range.
    pub fn contains(&self, id: ParticleId) -> bool {
        id >= self.begin && id < self.end
    }

    /// The range as a `usize` range, for slicing.
    pub fn as_usize(&self) -> Range<usize> {
        self.begin as usize..self.end as usize
    }

    /// Iterate over the indices.
    pub fn iter(&self) -> Range<ParticleId> {
        self.begin..self.end
    }

    /// The smallest group range covering this range: `begin` rounds down
    /// and `end` rounds up to the group stride. An empty range maps to an
    /// empty group range.
    pub fn groups(&self) -> GroupRange {
        let first = self.begin / GROUP_STRIDE;
        if self.is_empty() {
            return GroupRange { first, last: first };
        }
        GroupRange {
            first,
            last: align_up(self.end) / GROUP_STRIDE,
        }
    }

    /// Whether both bounds already sit on group boundaries.
    pub fn is_group_aligned(&self) -> bool {
        self.begin % GROUP_STRIDE == 0 && self.end % GROUP_STRIDE == 0
    }
}

impl IntoIterator for IndexRange {
    type Item = ParticleId;
    type IntoIter = Range<ParticleId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl From<Range<ParticleId>> for IndexRange {
    fn from(r: Range<ParticleId>) -> Self {
        Self::new(r.start, r.end)
    }
}

/// Half-open range of SIMD groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GroupRange {
    first: u32,
    last: u32,
}

impl GroupRange {
    /// Number of groups.
    pub fn len(&self) -> u32 {
        self.last - self.first
    }

    /// Whether the range holds no group.
    pub fn is_empty(&self) -> bool {
        self.first == self.last
    }

    /// The particle range spanned by these groups (always aligned).
    pub fn particles(&self) -> IndexRange {
        IndexRange::new(self.first * GROUP_STRIDE, self.last * GROUP_STRIDE)
    }

    /// Split into `[first, first + n)` and the remainder.
    ///
    /// `n` is clamped to the range length.
    pub fn split_at(&self, n: u32) -> (Self, Self) {
        let mid = self.first + n.min(self.len());
        (
            Self {
                first: self.first,
                last: mid,
            },
            Self {
                first: mid,
                last: self.last,
            },
        )
    }

    /// Iterate over the groups.
    pub fn iter(&self) -> impl Iterator<Item = GroupIndex> + '_ {
        (self.first..self.last).map(GroupIndex)
    }
}

impl IntoIterator for GroupRange {
    type Item = GroupIndex;
    type IntoIter = std::iter::Map<Range<u32>, fn(u32) -> GroupIndex>;

    fn into_iter(self) -> Self::IntoIter {
        (self.first..self.last).map(GroupIndex as fn(u32) -> GroupIndex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_to_stride() {
        assert_eq!(align_up(0), 0);
        assert_eq!(align_up(1), GROUP_STRIDE);
        assert_eq!(align_up(GROUP_STRIDE), GROUP_STRIDE);
        assert_eq!(align_down(GROUP_STRIDE + 1), GROUP_STRIDE);
    }

    #[test]
    fn index_range_basics() {
        let r = IndexRange::new(3, 7);
        assert_eq!(r.len(), 4);
        assert!(r.contains(3));
        assert!(!r.contains(7));
        assert_eq!(r.iter().collect::<Vec<_>>(), vec![3, 4, 5, 6]);
        assert!(IndexRange::empty_at(9).is_empty());
        assert!(IndexRange::empty_at(9).groups().is_empty());
    }

    #[test]
    #[should_panic(expected = "inverted")]
    fn inverted_range_panics() {
        let _ = IndexRange::new(5, 4);
    }

    #[test]
    fn groups_round_outward() {
        let r = IndexRange::new(5, 9);
        let g = r.groups();
        assert_eq!(g.particles(), IndexRange::new(4, 12));
        assert!(g.particles().is_group_aligned());
        assert!(!r.is_group_aligned());
        let firsts: Vec<_> = g.iter().map(|g| g.first_particle()).collect();
        assert_eq!(firsts, vec![4, 8]);
    }

    #[test]
    fn group_split_clamps() {
        let g = IndexRange::new(0, 16).groups();
        let (a, b) = g.split_at(1);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 3);
        let (all, none) = g.split_at(10);
        assert_eq!(all, g);
        assert!(none.is_empty());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn group_range_covers_index_range(begin in 0u32..1000, len in 1u32..1000) {
                let r = IndexRange::new(begin, begin + len);
                let covered = r.groups().particles();
                prop_assert!(covered.begin() <= r.begin());
                prop_assert!(covered.end() >= r.end());
                prop_assert!(covered.end() - r.end() < GROUP_STRIDE);
                prop_assert!(covered.is_group_aligned());
            }
        }
    }
}
