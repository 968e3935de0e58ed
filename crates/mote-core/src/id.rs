//! Strongly-typed identifiers for fields and particles.

use std::fmt;

/// Index of a particle slot inside a container.
///
/// A particle index is a storage position, not an identity: compaction
/// recycles indices, so an index held across a removal must be translated
/// through the remap returned by the container.
pub type ParticleId = u32;

/// Sentinel for "no particle" (e.g. a root particle's parent).
pub const INVALID_PARTICLE: ParticleId = u32::MAX;

/// Identifies one storage slot in a schema.
///
/// Slots are assigned sequentially at registration. A field of dimension
/// `d` owns `d` consecutive slots; its `FieldIndex` is the first of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldIndex(pub u32);

impl FieldIndex {
    /// The slot `offset` positions after this one.
    pub fn offset(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }

    /// This index as a `usize`, for table lookups.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Index of one SIMD group (`GROUP_STRIDE` consecutive particles).
///
/// Only produced by iterating a [`GroupRange`](crate::range::GroupRange),
/// so a `GroupIndex` always addresses a stride-aligned block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupIndex(pub(crate) u32);

impl GroupIndex {
    /// The raw group number.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Index of the first particle in this group.
    pub fn first_particle(self) -> ParticleId {
        self.0 * crate::GROUP_STRIDE
    }
}

impl fmt::Display for GroupIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_index_offset() {
        assert_eq!(FieldIndex(4).offset(3), FieldIndex(7));
        assert_eq!(FieldIndex(4).as_usize(), 4);
    }

    #[test]
    fn group_first_particle_is_stride_multiple() {
        let g = GroupIndex(3);
        assert_eq!(g.first_particle(), 3 * crate::GROUP_STRIDE);
        assert_eq!(g.to_string(), "g3");
    }
}
