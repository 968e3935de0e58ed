//! Typed stream accessors over container slots.
//!
//! Streams are borrowed views: they never allocate and cannot outlive the
//! container borrow they came from, so structural mutation (spawn,
//! removal, resize) is statically excluded while any stream is alive.
//!
//! - [`ReadStream`] reads one slot. A disabled slot reads as the default
//!   value passed when the stream was created.
//! - [`ReadWriteStream`] reads and writes one enabled slot. It can be
//!   split at a group boundary into disjoint halves for parallel work.
//! - [`Vec3Stream`], [`Vec3RwStream`], [`QuatStream`] and [`QuatRwStream`]
//!   compose the per-component slots of a vector field into `glam` values.
//! - [`StreamAccess`] hands out several of the above at once over
//!   distinct slots.

use glam::{Quat, Vec3};
use mote_core::{Element, FieldHandle, GroupIndex, IndexRange, ParticleId, INVALID_PARTICLE, LANES};
use wide::f32x4;

use crate::buffer::FieldBuffer;

/// Indices holding particle data: the committed prefix plus the staged
/// newborns. Slots in the gap between the two are stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Occupied {
    pub(crate) live: u32,
    pub(crate) spawned: IndexRange,
}

impl Occupied {
    #[inline]
    pub(crate) fn contains(&self, id: ParticleId) -> bool {
        id < self.live || self.spawned.contains(id)
    }
}

/// Read-only view of one slot.
#[derive(Clone, Copy, Debug)]
pub struct ReadStream<'a, T: Element> {
    data: Option<&'a [T]>,
    default: T,
    occupied: Occupied,
}

impl<'a, T: Element> ReadStream<'a, T> {
    pub(crate) fn new(data: Option<&'a [T]>, default: T, occupied: Occupied) -> Self {
        Self {
            data,
            default,
            occupied,
        }
    }

    /// Value at `id`, or the default if the slot is disabled.
    ///
    /// # Panics
    ///
    /// Panics if the slot is enabled and `id` is not below the capacity.
    #[inline]
    #[track_caller]
    pub fn load(&self, id: ParticleId) -> T {
        match self.data {
            Some(data) => data[id as usize],
            None => self.default,
        }
    }

    /// Like [`ReadStream::load`], but returns the default for
    /// [`INVALID_PARTICLE`] and for any id that is neither live nor a
    /// staged newborn, instead of reading a stale slot or panicking.
    #[inline]
    pub fn safe_load(&self, id: ParticleId) -> T {
        if id == INVALID_PARTICLE || !self.occupied.contains(id) {
            return self.default;
        }
        self.load(id)
    }

    /// The [`LANES`] values of one group.
    #[inline]
    pub fn load_group(&self, group: GroupIndex) -> [T; LANES] {
        match self.data {
            Some(data) => {
                let start = group.first_particle() as usize;
                let mut out = [self.default; LANES];
                out.copy_from_slice(&data[start..start + LANES]);
                out
            }
            None => [self.default; LANES],
        }
    }

    /// Value returned for disabled slots and unoccupied safe loads.
    pub fn default_value(&self) -> T {
        self.default
    }

    /// Whether the slot is enabled.
    pub fn is_present(&self) -> bool {
        self.data.is_some()
    }

    /// The slot contents up to the capacity, if enabled.
    pub fn as_slice(&self) -> Option<&'a [T]> {
        self.data
    }
}

impl ReadStream<'_, f32> {
    /// One group as a float vector.
    #[inline]
    pub fn load_lanes(&self, group: GroupIndex) -> f32x4 {
        f32x4::new(self.load_group(group))
    }
}

/// Read/write view of one enabled slot, or of a group-aligned part of it.
///
/// Indices are always container particle indices, also after
/// [`ReadWriteStream::split_at_group`].
#[derive(Debug)]
pub struct ReadWriteStream<'a, T: Element> {
    data: &'a mut [T],
    base: u32,
}

impl<'a, T: Element> ReadWriteStream<'a, T> {
    pub(crate) fn new(data: &'a mut [T]) -> Self {
        Self { data, base: 0 }
    }

    #[inline]
    fn local(&self, id: ParticleId) -> usize {
        (id - self.base) as usize
    }

    /// Value at `id`.
    #[inline]
    #[track_caller]
    pub fn load(&self, id: ParticleId) -> T {
        self.data[self.local(id)]
    }

    /// Write `value` at `id`.
    #[inline]
    #[track_caller]
    pub fn store(&mut self, id: ParticleId, value: T) {
        let i = self.local(id);
        self.data[i] = value;
    }

    /// Write `value` over a whole range.
    #[track_caller]
    pub fn fill(&mut self, range: IndexRange, value: T) {
        let begin = self.local(range.begin());
        self.data[begin..begin + range.len() as usize].fill(value);
    }

    /// The [`LANES`] values of one group.
    #[inline]
    #[track_caller]
    pub fn load_group(&self, group: GroupIndex) -> [T; LANES] {
        let start = self.local(group.first_particle());
        let mut out = [T::default(); LANES];
        out.copy_from_slice(&self.data[start..start + LANES]);
        out
    }

    /// Write one group.
    #[inline]
    #[track_caller]
    pub fn store_group(&mut self, group: GroupIndex, values: [T; LANES]) {
        let start = self.local(group.first_particle());
        self.data[start..start + LANES].copy_from_slice(&values);
    }

    /// Particle range covered by this stream.
    pub fn range(&self) -> IndexRange {
        IndexRange::new(self.base, self.base + self.data.len() as u32)
    }

    /// Split into the particles before `group` and the rest.
    ///
    /// Both halves may be sent to different threads.
    ///
    /// # Panics
    ///
    /// Panics if `group` starts outside this stream.
    #[track_caller]
    pub fn split_at_group(self, group: GroupIndex) -> (Self, Self) {
        let at = group.first_particle();
        assert!(
            at >= self.base && (at - self.base) as usize <= self.data.len(),
            "split group {group} outside stream range {:?}",
            self.range()
        );
        let (lo, hi) = self.data.split_at_mut((at - self.base) as usize);
        (
            Self {
                data: lo,
                base: self.base,
            },
            Self { data: hi, base: at },
        )
    }

    /// Contents of this stream, starting at [`range().begin()`](Self::range).
    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    /// Mutable contents of this stream.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }
}

impl ReadWriteStream<'_, f32> {
    /// One group as a float vector.
    #[inline]
    pub fn load_lanes(&self, group: GroupIndex) -> f32x4 {
        f32x4::new(self.load_group(group))
    }

    /// Write one group from a float vector.
    #[inline]
    pub fn store_lanes(&mut self, group: GroupIndex, values: f32x4) {
        self.store_group(group, values.to_array());
    }
}

/// Read-only view of a three-component float field.
#[derive(Clone, Copy, Debug)]
pub struct Vec3Stream<'a> {
    x: ReadStream<'a, f32>,
    y: ReadStream<'a, f32>,
    z: ReadStream<'a, f32>,
}

impl<'a> Vec3Stream<'a> {
    pub(crate) fn new(x: ReadStream<'a, f32>, y: ReadStream<'a, f32>, z: ReadStream<'a, f32>) -> Self {
        Self { x, y, z }
    }

    /// Vector at `id`.
    #[inline]
    pub fn load(&self, id: ParticleId) -> Vec3 {
        Vec3::new(self.x.load(id), self.y.load(id), self.z.load(id))
    }

    /// Vector at `id`, or the default if `id` holds no particle.
    #[inline]
    pub fn safe_load(&self, id: ParticleId) -> Vec3 {
        Vec3::new(self.x.safe_load(id), self.y.safe_load(id), self.z.safe_load(id))
    }

    /// Whether the field is enabled.
    pub fn is_present(&self) -> bool {
        self.x.is_present()
    }
}

/// Read/write view of a three-component float field.
#[derive(Debug)]
pub struct Vec3RwStream<'a> {
    x: ReadWriteStream<'a, f32>,
    y: ReadWriteStream<'a, f32>,
    z: ReadWriteStream<'a, f32>,
}

impl Vec3RwStream<'_> {
    /// Vector at `id`.
    #[inline]
    pub fn load(&self, id: ParticleId) -> Vec3 {
        Vec3::new(self.x.load(id), self.y.load(id), self.z.load(id))
    }

    /// Write the vector at `id`.
    #[inline]
    pub fn store(&mut self, id: ParticleId, v: Vec3) {
        self.x.store(id, v.x);
        self.y.store(id, v.y);
        self.z.store(id, v.z);
    }

    /// Write `v` over a whole range.
    pub fn fill(&mut self, range: IndexRange, v: Vec3) {
        self.x.fill(range, v.x);
        self.y.fill(range, v.y);
        self.z.fill(range, v.z);
    }
}

/// Read-only view of a quaternion field stored as `x, y, z, w` slots.
#[derive(Clone, Copy, Debug)]
pub struct QuatStream<'a> {
    c: [ReadStream<'a, f32>; 4],
}

impl<'a> QuatStream<'a> {
    pub(crate) fn new(c: [ReadStream<'a, f32>; 4]) -> Self {
        Self { c }
    }

    /// Rotation at `id`.
    #[inline]
    pub fn load(&self, id: ParticleId) -> Quat {
        Quat::from_xyzw(
            self.c[0].load(id),
            self.c[1].load(id),
            self.c[2].load(id),
            self.c[3].load(id),
        )
    }

    /// Rotation at `id`, or the default if `id` holds no particle.
    #[inline]
    pub fn safe_load(&self, id: ParticleId) -> Quat {
        Quat::from_xyzw(
            self.c[0].safe_load(id),
            self.c[1].safe_load(id),
            self.c[2].safe_load(id),
            self.c[3].safe_load(id),
        )
    }

    /// Whether the field is enabled.
    pub fn is_present(&self) -> bool {
        self.c[0].is_present()
    }
}

/// Read/write view of a quaternion field.
#[derive(Debug)]
pub struct QuatRwStream<'a> {
    c: [ReadWriteStream<'a, f32>; 4],
}

impl QuatRwStream<'_> {
    /// Rotation at `id`.
    #[inline]
    pub fn load(&self, id: ParticleId) -> Quat {
        Quat::from_xyzw(
            self.c[0].load(id),
            self.c[1].load(id),
            self.c[2].load(id),
            self.c[3].load(id),
        )
    }

    /// Write the rotation at `id`.
    #[inline]
    pub fn store(&mut self, id: ParticleId, q: Quat) {
        let [x, y, z, w] = q.to_array();
        self.c[0].store(id, x);
        self.c[1].store(id, y);
        self.c[2].store(id, z);
        self.c[3].store(id, w);
    }

    /// Write `q` over a whole range.
    pub fn fill(&mut self, range: IndexRange, q: Quat) {
        for (stream, v) in self.c.iter_mut().zip(q.to_array()) {
            stream.fill(range, v);
        }
    }
}

/// Borrow state of one slot inside a [`StreamAccess`].
#[derive(Debug)]
enum SlotState<'a> {
    Free(&'a mut FieldBuffer),
    Shared(&'a FieldBuffer),
    Taken,
    Disabled,
}

/// Hands out several streams over one container at once.
///
/// Obtained from [`ParticleContainer::streams`](crate::ParticleContainer::streams).
/// Any number of read streams may share a slot; a read/write stream takes
/// its slots exclusively. Asking for a slot in a conflicting way panics.
#[derive(Debug)]
pub struct StreamAccess<'a> {
    slots: Vec<SlotState<'a>>,
    occupied: Occupied,
}

impl<'a> StreamAccess<'a> {
    pub(crate) fn new(
        buffers: impl Iterator<Item = Option<&'a mut FieldBuffer>>,
        occupied: Occupied,
    ) -> Self {
        Self {
            slots: buffers
                .map(|b| b.map_or(SlotState::Disabled, SlotState::Free))
                .collect(),
            occupied,
        }
    }

    #[track_caller]
    fn share(&mut self, slot: u32) -> Option<&'a FieldBuffer> {
        let state = &mut self.slots[slot as usize];
        match std::mem::replace(state, SlotState::Taken) {
            SlotState::Free(buf) => {
                let shared: &'a FieldBuffer = buf;
                *state = SlotState::Shared(shared);
                Some(shared)
            }
            SlotState::Shared(buf) => {
                *state = SlotState::Shared(buf);
                Some(buf)
            }
            SlotState::Disabled => {
                *state = SlotState::Disabled;
                None
            }
            SlotState::Taken => panic!("slot {slot} is already borrowed by a read/write stream"),
        }
    }

    #[track_caller]
    fn take(&mut self, slot: u32) -> Option<&'a mut FieldBuffer> {
        let state = &mut self.slots[slot as usize];
        match std::mem::replace(state, SlotState::Taken) {
            SlotState::Free(buf) => Some(buf),
            SlotState::Disabled => {
                *state = SlotState::Disabled;
                None
            }
            SlotState::Shared(_) | SlotState::Taken => {
                panic!("slot {slot} is already borrowed by another stream")
            }
        }
    }

    /// Read stream over a scalar field (or one component).
    #[track_caller]
    pub fn read<T: Element>(&mut self, handle: FieldHandle<T>, default: T) -> ReadStream<'a, T> {
        let data = self.share(handle.index().0).map(FieldBuffer::typed::<T>);
        ReadStream::new(data, default, self.occupied)
    }

    /// Read/write stream over an enabled scalar field, or `None` if the
    /// field is disabled.
    #[track_caller]
    pub fn try_write<T: Element>(&mut self, handle: FieldHandle<T>) -> Option<ReadWriteStream<'a, T>> {
        self.take(handle.index().0)
            .map(|buf| ReadWriteStream::new(buf.typed_mut::<T>()))
    }

    /// Read/write stream over an enabled scalar field.
    ///
    /// # Panics
    ///
    /// Panics if the field is disabled or already borrowed.
    #[track_caller]
    pub fn write<T: Element>(&mut self, handle: FieldHandle<T>) -> ReadWriteStream<'a, T> {
        match self.try_write(handle) {
            Some(stream) => stream,
            None => panic!("write stream requested for disabled field {handle:?}"),
        }
    }

    /// Read stream over a three-component float field.
    #[track_caller]
    pub fn read_vec3(&mut self, handle: FieldHandle<f32>, default: Vec3) -> Vec3Stream<'a> {
        check_dimension(&handle, 3);
        Vec3Stream::new(
            self.read(handle.component(0), default.x),
            self.read(handle.component(1), default.y),
            self.read(handle.component(2), default.z),
        )
    }

    /// Read/write stream over an enabled three-component float field.
    #[track_caller]
    pub fn write_vec3(&mut self, handle: FieldHandle<f32>) -> Vec3RwStream<'a> {
        check_dimension(&handle, 3);
        Vec3RwStream {
            x: self.write(handle.component(0)),
            y: self.write(handle.component(1)),
            z: self.write(handle.component(2)),
        }
    }

    /// Read stream over a quaternion field.
    #[track_caller]
    pub fn read_quat(&mut self, handle: FieldHandle<f32>, default: Quat) -> QuatStream<'a> {
        check_dimension(&handle, 4);
        let d = default.to_array();
        QuatStream::new([
            self.read(handle.component(0), d[0]),
            self.read(handle.component(1), d[1]),
            self.read(handle.component(2), d[2]),
            self.read(handle.component(3), d[3]),
        ])
    }

    /// Read/write stream over an enabled quaternion field.
    #[track_caller]
    pub fn write_quat(&mut self, handle: FieldHandle<f32>) -> QuatRwStream<'a> {
        check_dimension(&handle, 4);
        QuatRwStream {
            c: [
                self.write(handle.component(0)),
                self.write(handle.component(1)),
                self.write(handle.component(2)),
                self.write(handle.component(3)),
            ],
        }
    }
}

#[track_caller]
pub(crate) fn check_dimension<T: Element>(handle: &FieldHandle<T>, dimension: u8) {
    assert_eq!(
        handle.dimension(),
        dimension,
        "{handle:?} used as a {dimension}-component stream"
    );
}
