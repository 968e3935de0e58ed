//! Field element types, flags, descriptors, typed handles and the
//! [`FieldSet`] bitset.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use crate::id::FieldIndex;

/// Scalar storage type of one field slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Unsigned byte.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer (particle ids, spawn ids).
    U32,
    /// Signed 32-bit integer.
    I32,
    /// Unsigned 64-bit integer.
    U64,
    /// 32-bit float.
    F32,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::U64 => 8,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::U64 => "u64",
            Self::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// A Rust scalar type that can back a field slot.
///
/// Implemented for the primitive types listed in [`ElementType`]. The
/// `Pod` bound is what lets containers reinterpret raw slot bytes as a
/// typed slice without `unsafe`.
pub trait Element: bytemuck::Pod + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag for this type.
    const TYPE: ElementType;
}

impl Element for u8 {
    const TYPE: ElementType = ElementType::U8;
}
impl Element for u16 {
    const TYPE: ElementType = ElementType::U16;
}
impl Element for u32 {
    const TYPE: ElementType = ElementType::U32;
}
impl Element for i32 {
    const TYPE: ElementType = ElementType::I32;
}
impl Element for u64 {
    const TYPE: ElementType = ElementType::U64;
}
impl Element for f32 {
    const TYPE: ElementType = ElementType::F32;
}

bitflags::bitflags! {
    /// Domain flags attached to a field at registration.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// The field owns a parallel shadow (the `dimension` slots right
        /// after it) holding initial values during the spawn frame.
        const INIT_SLOT = 1 << 0;
        /// Buffers must be zero-filled whenever the field is (re)enabled.
        const CLEAR_ON_ENABLE = 1 << 1;
    }
}

/// Storage shape of a field: element type, dimension and flags.
///
/// Two registrations of the same name are compatible only when their
/// shapes are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldShape {
    /// Scalar type of every slot.
    pub element_type: ElementType,
    /// Number of components (1 scalar, 3 vector, 4 quaternion).
    pub dimension: u8,
    /// Domain flags.
    pub flags: FieldFlags,
}

impl FieldShape {
    /// Number of slots the field occupies, including the init shadow.
    pub fn slot_count(&self) -> u32 {
        let shadow = if self.flags.contains(FieldFlags::INIT_SLOT) { 2 } else { 1 };
        u32::from(self.dimension) * shadow
    }
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.element_type, self.dimension)?;
        if !self.flags.is_empty() {
            write!(f, " {:?}", self.flags)?;
        }
        Ok(())
    }
}

/// Registry entry for one field.
///
/// Created once at schema build and never mutated; shared read-only by
/// every container built from the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Registration name.
    pub name: String,
    /// First slot owned by the field.
    pub index: FieldIndex,
    /// Storage shape.
    pub shape: FieldShape,
}

impl FieldDescriptor {
    /// Size of one scalar element in bytes.
    pub fn element_size(&self) -> usize {
        self.shape.element_type.size()
    }

    /// Number of components.
    pub fn dimension(&self) -> u8 {
        self.shape.dimension
    }

    /// Domain flags.
    pub fn flags(&self) -> FieldFlags {
        self.shape.flags
    }

    /// First slot of the init shadow, if the field has one.
    pub fn init_index(&self) -> Option<FieldIndex> {
        self.flags()
            .contains(FieldFlags::INIT_SLOT)
            .then(|| self.index.offset(u32::from(self.dimension())))
    }

    /// All slot indices owned by the field (components, then shadow).
    pub fn slots(&self) -> Range<u32> {
        self.index.0..self.index.0 + self.shape.slot_count()
    }
}

/// A typed reference to a registered field (or one of its components).
///
/// Handles are plain indices tagged with the element type, so they are
/// `Copy` and cheap to store in feature code. Obtained from
/// [`SchemaBuilder::register`](crate::schema::SchemaBuilder::register) or
/// [`Schema::handle`](crate::schema::Schema::handle).
pub struct FieldHandle<T> {
    index: FieldIndex,
    dimension: u8,
    init_offset: u8,
    flags: FieldFlags,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Element> FieldHandle<T> {
    pub(crate) fn new(index: FieldIndex, dimension: u8, flags: FieldFlags) -> Self {
        Self {
            index,
            dimension,
            init_offset: dimension,
            flags,
            _marker: PhantomData,
        }
    }

    /// First slot of the field.
    pub fn index(&self) -> FieldIndex {
        self.index
    }

    /// Number of components addressed by this handle.
    pub fn dimension(&self) -> u8 {
        self.dimension
    }

    /// Domain flags of the underlying field.
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    /// Handle to a single component slot (`0` is X or the scalar itself).
    ///
    /// # Panics
    ///
    /// Panics if `component >= self.dimension()`.
    #[track_caller]
    pub fn component(&self, component: u8) -> Self {
        assert!(
            component < self.dimension,
            "component {component} out of range for dimension {}",
            self.dimension
        );
        Self {
            index: self.index.offset(u32::from(component)),
            dimension: 1,
            init_offset: self.init_offset,
            flags: self.flags,
            _marker: PhantomData,
        }
    }

    /// Handle to the init shadow of this field, if it has one.
    pub fn init(&self) -> Option<Self> {
        if !self.flags.contains(FieldFlags::INIT_SLOT) {
            return None;
        }
        Some(Self {
            index: self.index.offset(u32::from(self.init_offset)),
            dimension: self.dimension,
            init_offset: self.init_offset,
            flags: self.flags - FieldFlags::INIT_SLOT,
            _marker: PhantomData,
        })
    }

    /// Slot indices addressed by this handle (components only).
    pub fn slots(&self) -> Range<u32> {
        self.index.0..self.index.0 + u32::from(self.dimension)
    }
}

impl<T> Clone for FieldHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldHandle<T> {}

impl<T> PartialEq for FieldHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.dimension == other.dimension
    }
}

impl<T> Eq for FieldHandle<T> {}

impl<T: Element> fmt::Debug for FieldHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FieldHandle<{}>(slot={}, dim={})",
            T::TYPE,
            self.index,
            self.dimension
        )
    }
}

/// A set of slot indices implemented as a dynamically-sized bitset.
///
/// Containers use it to track which slots are enabled.
#[derive(Clone, Debug, Default)]
pub struct FieldSet {
    bits: Vec<u64>,
}

impl FieldSet {
    const BITS_PER_WORD: usize = 64;

    /// Create an empty field set.
    pub fn empty() -> Self {
        Self { bits: Vec::new() }
    }

    /// Insert a slot into the set. Returns `true` if it was not present.
    pub fn insert(&mut self, field: FieldIndex) -> bool {
        let word = field.0 as usize / Self::BITS_PER_WORD;
        let bit = field.0 as usize % Self::BITS_PER_WORD;
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let was_set = self.bits[word] & (1u64 << bit) != 0;
        self.bits[word] |= 1u64 << bit;
        !was_set
    }

    /// Check whether the set contains a slot.
    pub fn contains(&self, field: FieldIndex) -> bool {
        let word = field.0 as usize / Self::BITS_PER_WORD;
        let bit = field.0 as usize % Self::BITS_PER_WORD;
        word < self.bits.len() && (self.bits[word] & (1u64 << bit)) != 0
    }

    /// Remove every slot.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// Returns `true` if the set contains no slots.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }

    /// Returns the number of slots in the set.
    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over the slots in the set, in ascending order.
    pub fn iter(&self) -> FieldSetIter<'_> {
        FieldSetIter {
            bits: &self.bits,
            word_idx: 0,
            bit_idx: 0,
        }
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        let max_len = self.bits.len().max(other.bits.len());
        (0..max_len).all(|i| {
            self.bits.get(i).copied().unwrap_or(0) == other.bits.get(i).copied().unwrap_or(0)
        })
    }
}

impl Eq for FieldSet {}

impl FromIterator<FieldIndex> for FieldSet {
    fn from_iter<I: IntoIterator<Item = FieldIndex>>(iter: I) -> Self {
        let mut set = Self::empty();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = FieldIndex;
    type IntoIter = FieldSetIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`FieldSet`], yielding slots in ascending order.
pub struct FieldSetIter<'a> {
    bits: &'a [u64],
    word_idx: usize,
    bit_idx: usize,
}

impl Iterator for FieldSetIter<'_> {
    type Item = FieldIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while self.word_idx < self.bits.len() {
            let word = self.bits[self.word_idx];
            while self.bit_idx < 64 {
                let bit = self.bit_idx;
                self.bit_idx += 1;
                if word & (1u64 << bit) != 0 {
                    return Some(FieldIndex((self.word_idx * 64 + bit) as u32));
                }
            }
            self.word_idx += 1;
            self.bit_idx = 0;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_sizes() {
        assert_eq!(ElementType::U8.size(), 1);
        assert_eq!(ElementType::U16.size(), 2);
        assert_eq!(ElementType::F32.size(), 4);
        assert_eq!(ElementType::U64.size(), 8);
        assert_eq!(<f32 as Element>::TYPE, ElementType::F32);
    }

    #[test]
    fn slot_count_includes_init_shadow() {
        let plain = FieldShape {
            element_type: ElementType::F32,
            dimension: 3,
            flags: FieldFlags::empty(),
        };
        let shadowed = FieldShape {
            flags: FieldFlags::INIT_SLOT,
            ..plain
        };
        assert_eq!(plain.slot_count(), 3);
        assert_eq!(shadowed.slot_count(), 6);
    }

    #[test]
    fn descriptor_init_index_follows_components() {
        let desc = FieldDescriptor {
            name: "position".into(),
            index: FieldIndex(10),
            shape: FieldShape {
                element_type: ElementType::F32,
                dimension: 3,
                flags: FieldFlags::INIT_SLOT,
            },
        };
        assert_eq!(desc.init_index(), Some(FieldIndex(13)));
        assert_eq!(desc.slots(), 10..16);
    }

    #[test]
    fn handle_component_and_init() {
        let h = FieldHandle::<f32>::new(FieldIndex(4), 3, FieldFlags::INIT_SLOT);
        let y = h.component(1);
        assert_eq!(y.index(), FieldIndex(5));
        assert_eq!(y.dimension(), 1);
        // The component's shadow sits one full dimension later.
        assert_eq!(y.init().unwrap().index(), FieldIndex(8));
        let init = h.init().unwrap();
        assert_eq!(init.index(), FieldIndex(7));
        assert!(init.init().is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn handle_component_out_of_range_panics() {
        let h = FieldHandle::<f32>::new(FieldIndex(0), 3, FieldFlags::empty());
        let _ = h.component(3);
    }

    #[test]
    fn field_set_insert_clear() {
        let mut set = FieldSet::empty();
        assert!(set.insert(FieldIndex(3)));
        assert!(!set.insert(FieldIndex(3)));
        assert!(set.insert(FieldIndex(130)));
        assert_eq!(set.len(), 2);
        assert!(set.contains(FieldIndex(130)));
        assert_eq!(set, [FieldIndex(130), FieldIndex(3)].into_iter().collect());
        set.clear();
        assert!(set.is_empty());
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_field_set() -> impl Strategy<Value = FieldSet> {
            prop::collection::vec(0u32..128, 0..32)
                .prop_map(|ids| ids.into_iter().map(FieldIndex).collect::<FieldSet>())
        }

        proptest! {
            #[test]
            fn insert_contains(id in 0u32..256) {
                let mut set = FieldSet::empty();
                set.insert(FieldIndex(id));
                prop_assert!(set.contains(FieldIndex(id)));
                prop_assert_eq!(set.len(), 1);
            }

            #[test]
            fn len_matches_iter_count(a in arb_field_set()) {
                prop_assert_eq!(a.len(), a.iter().count());
            }

            #[test]
            fn iter_is_ascending(a in arb_field_set()) {
                let ids: Vec<_> = a.iter().collect();
                prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }
}
