//! Type-erased per-slot storage.
//!
//! A [`FieldBuffer`] holds `capacity` elements of one scalar type as raw
//! words. Backing the bytes with `u64` keeps every buffer 8-byte aligned,
//! which lets `bytemuck` reinterpret it as a `&[T]` of any element type
//! without `unsafe`.

use std::mem::size_of;

use mote_core::{Element, ElementType};

use crate::compaction::Move;

const WORD: usize = size_of::<u64>();

/// Storage for one slot of a container.
#[derive(Clone, Debug)]
pub(crate) struct FieldBuffer {
    words: Vec<u64>,
    element_type: ElementType,
    capacity: u32,
}

impl FieldBuffer {
    /// A zero-filled buffer of `capacity` elements.
    pub(crate) fn zeroed(element_type: ElementType, capacity: u32) -> Self {
        let bytes = element_type.size() * capacity as usize;
        Self {
            words: vec![0; bytes.div_ceil(WORD)],
            element_type,
            capacity,
        }
    }

    pub(crate) fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    fn len_bytes(&self) -> usize {
        self.element_type.size() * self.capacity as usize
    }

    /// Bytes of the allocation, including word padding.
    pub(crate) fn memory_bytes(&self) -> usize {
        self.words.len() * WORD
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len_bytes()]
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len_bytes();
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..len]
    }

    /// View as a typed slice of `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the buffer's element type.
    #[track_caller]
    pub(crate) fn typed<T: Element>(&self) -> &[T] {
        self.check_type::<T>();
        &bytemuck::cast_slice::<u64, T>(&self.words)[..self.capacity as usize]
    }

    /// Mutable view as a typed slice of `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not the buffer's element type.
    #[track_caller]
    pub(crate) fn typed_mut<T: Element>(&mut self) -> &mut [T] {
        self.check_type::<T>();
        let len = self.capacity as usize;
        &mut bytemuck::cast_slice_mut::<u64, T>(&mut self.words)[..len]
    }

    #[track_caller]
    fn check_type<T: Element>(&self) {
        assert_eq!(
            T::TYPE,
            self.element_type,
            "slot holds {}, accessed as {}",
            self.element_type,
            T::TYPE
        );
    }

    /// Reallocate to `capacity` elements, keeping the first `extent`.
    pub(crate) fn reallocate(&mut self, capacity: u32, extent: u32) {
        debug_assert!(extent <= capacity && extent <= self.capacity);
        let keep = self.element_type.size() * extent as usize;
        let mut next = Self::zeroed(self.element_type, capacity);
        next.bytes_mut()[..keep].copy_from_slice(&self.bytes()[..keep]);
        *self = next;
    }

    pub(crate) fn zero_fill(&mut self) {
        self.words.fill(0);
    }

    /// Move `count` elements starting at `src` down to `dst`.
    pub(crate) fn shift_down(&mut self, src: u32, dst: u32, count: u32) {
        let size = self.element_type.size();
        let src = src as usize * size;
        let len = count as usize * size;
        self.bytes_mut().copy_within(src..src + len, dst as usize * size);
    }

    /// Copy elements `[begin, end)` of `src` into the same positions here.
    pub(crate) fn copy_range_from(&mut self, src: &FieldBuffer, begin: u32, end: u32) {
        debug_assert_eq!(self.element_type, src.element_type);
        let size = self.element_type.size();
        let bytes = begin as usize * size..end as usize * size;
        self.bytes_mut()[bytes.clone()].copy_from_slice(&src.bytes()[bytes]);
    }

    /// Apply a compaction plan: for each move, `dst` takes the value at `src`.
    pub(crate) fn apply_moves(&mut self, moves: &[Move]) {
        match self.element_type.size() {
            1 => apply_typed::<u8>(bytemuck::cast_slice_mut(&mut self.words), moves),
            4 => apply_typed::<u32>(bytemuck::cast_slice_mut(&mut self.words), moves),
            8 => apply_typed::<u64>(&mut self.words, moves),
            size => {
                let bytes = self.bytes_mut();
                for m in moves {
                    let src = m.src as usize * size;
                    bytes.copy_within(src..src + size, m.dst as usize * size);
                }
            }
        }
    }
}

#[inline]
fn apply_typed<T: Copy>(data: &mut [T], moves: &[Move]) {
    for m in moves {
        data[m.dst as usize] = data[m.src as usize];
    }
}
