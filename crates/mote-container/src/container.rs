//! The structure-of-arrays particle container.
//!
//! # Layout
//!
//! ```text
//! index:  0 ............ live   spawn_begin ...... spawn_end ..... capacity
//!         [ live particles ][gap][ pending newborns ][   unused     ]
//! ```
//!
//! Live particles always occupy `[0, live)`. A spawn batch is staged in
//! `[spawn_begin, spawn_end)` starting at the first group boundary at or
//! after `live`, so newborn initialization can run whole groups without
//! touching live data. [`ParticleContainer::reset_spawned_particles`]
//! closes the gap and folds the newborns into the live range.
//!
//! # Slots
//!
//! Every schema slot has an optional buffer. A slot is enabled
//! by [`ParticleContainer::add_slot`] or
//! [`ParticleContainer::add_particle_data`]; enabled buffers always hold
//! exactly `capacity` elements. Disabled slots read as their stream
//! default and may keep a stale buffer until the next resize or trim.

use std::sync::Arc;

use glam::{Quat, Vec3};
use mote_core::{
    align_up, Element, FieldFlags, FieldHandle, FieldIndex, FieldSet, IndexRange, ParticleId,
    Schema, GROUP_STRIDE, INVALID_PARTICLE,
};

use crate::buffer::FieldBuffer;
use crate::compaction::{CompactionPlan, ParticleRemap};
use crate::config::ContainerConfig;
use crate::error::ContainerError;
use crate::stream::{
    check_dimension, Occupied, QuatRwStream, QuatStream, ReadStream, ReadWriteStream, StreamAccess,
    Vec3RwStream, Vec3Stream,
};

/// One contiguous run of newborns sharing a parent.
///
/// Age and fraction ramps let a continuous emitter spawn particles that
/// are already partially aged, as if they had been emitted at their exact
/// sub-frame time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnEntry {
    /// Index of the spawning particle in the parent container, or
    /// [`INVALID_PARTICLE`] for root emission.
    pub parent_id: ParticleId,
    /// Number of particles.
    pub count: u32,
    /// Normalized age of the first particle.
    pub age_begin: f32,
    /// Age step between consecutive particles.
    pub age_increment: f32,
    /// Spawn fraction of the first particle.
    pub fraction_begin: f32,
    /// Fraction step between consecutive particles.
    pub fraction_increment: f32,
}

impl SpawnEntry {
    /// `count` root particles born at age zero.
    pub fn new(count: u32) -> Self {
        Self {
            parent_id: INVALID_PARTICLE,
            count,
            age_begin: 0.0,
            age_increment: 0.0,
            fraction_begin: 0.0,
            fraction_increment: 0.0,
        }
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent_id: ParticleId) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the normalized age ramp.
    pub fn with_age(mut self, begin: f32, increment: f32) -> Self {
        self.age_begin = begin;
        self.age_increment = increment;
        self
    }

    /// Set the spawn fraction ramp.
    pub fn with_fraction(mut self, begin: f32, increment: f32) -> Self {
        self.fraction_begin = begin;
        self.fraction_increment = increment;
        self
    }
}

impl Default for SpawnEntry {
    fn default() -> Self {
        Self::new(0)
    }
}

/// The newborn block moved by the last commit, kept for [`ParticleContainer::real_id`].
#[derive(Clone, Copy, Debug)]
struct CommitShift {
    staged: IndexRange,
    shift: u32,
}

/// Columnar storage for the particles of one emitter.
///
/// Not internally synchronized: structural operations take `&mut self`,
/// so the borrow checker keeps them apart from live streams.
#[derive(Debug)]
pub struct ParticleContainer {
    schema: Arc<Schema>,
    config: ContainerConfig,
    buffers: Vec<Option<FieldBuffer>>,
    enabled: FieldSet,
    capacity: u32,
    live_count: u32,
    spawn_begin: u32,
    spawn_end: u32,
    next_spawn_id: u32,
    last_commit: Option<CommitShift>,
}

impl ParticleContainer {
    /// Create an empty container for `schema`.
    ///
    /// No slot is enabled yet.
    pub fn new(schema: Arc<Schema>, config: ContainerConfig) -> Result<Self, ContainerError> {
        config.validate()?;
        let capacity = config.aligned_initial_capacity();
        let slots = schema.slot_count();
        tracing::debug!(slots, capacity, "particle container created");
        Ok(Self {
            schema,
            config,
            buffers: vec![None; slots],
            enabled: FieldSet::empty(),
            capacity,
            live_count: 0,
            spawn_begin: 0,
            spawn_end: 0,
            next_spawn_id: 0,
            last_commit: None,
        })
    }

    /// The schema this container was built for.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The configuration the container was created with.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Allocated particle slots per enabled field.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of committed particles.
    pub fn live_count(&self) -> u32 {
        self.live_count
    }

    /// Whether a spawn batch is staged and not yet committed.
    pub fn has_new_born(&self) -> bool {
        self.spawn_end > self.spawn_begin
    }

    /// `[0, live)`.
    pub fn live_range(&self) -> IndexRange {
        IndexRange::new(0, self.live_count)
    }

    /// The staged newborns.
    pub fn spawned_range(&self) -> IndexRange {
        IndexRange::new(self.spawn_begin, self.spawn_end)
    }

    /// Every index that may hold particle data, staged newborns included.
    pub fn full_range(&self) -> IndexRange {
        IndexRange::new(0, self.extent())
    }

    fn extent(&self) -> u32 {
        self.live_count.max(self.spawn_end)
    }

    fn occupied(&self) -> Occupied {
        Occupied {
            live: self.live_count,
            spawned: self.spawned_range(),
        }
    }

    /// Bytes held by all buffers, stale ones included.
    pub fn memory_bytes(&self) -> usize {
        self.buffers
            .iter()
            .flatten()
            .map(FieldBuffer::memory_bytes)
            .sum()
    }

    /// Enabled slots.
    pub fn enabled_slots(&self) -> &FieldSet {
        &self.enabled
    }

    /// Whether every slot addressed by `handle` is enabled.
    pub fn has_field<T: Element>(&self, handle: FieldHandle<T>) -> bool {
        handle.slots().all(|s| self.enabled.contains(FieldIndex(s)))
    }

    /// Raw bytes of an enabled slot.
    pub fn field_bytes(&self, index: FieldIndex) -> Option<&[u8]> {
        self.enabled_buffer(index).map(FieldBuffer::bytes)
    }

    fn enabled_buffer(&self, index: FieldIndex) -> Option<&FieldBuffer> {
        if !self.enabled.contains(index) {
            return None;
        }
        self.buffers.get(index.as_usize())?.as_ref()
    }

    fn enabled_buffers_mut(&mut self) -> impl Iterator<Item = &mut FieldBuffer> + '_ {
        let enabled = &self.enabled;
        self.buffers
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| enabled.contains(FieldIndex(*i as u32)))
            .filter_map(|(_, buf)| buf.as_mut())
    }

    // ── Slot lifecycle ────────────────────────────────────────────────

    /// Enable one slot, allocating it at the current capacity.
    ///
    /// Re-enabling a slot that kept its buffer preserves the stale
    /// contents unless the field is flagged [`FieldFlags::CLEAR_ON_ENABLE`].
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a slot of the schema.
    #[track_caller]
    pub fn add_slot(&mut self, index: FieldIndex) {
        let Some(info) = self.schema.slot(index).copied() else {
            panic!("slot {index} is not part of the schema");
        };
        if !self.enabled.insert(index) {
            return;
        }
        let capacity = self.capacity;
        match &mut self.buffers[index.as_usize()] {
            Some(buf) if buf.capacity() == capacity && buf.element_type() == info.element_type => {
                if info.flags.contains(FieldFlags::CLEAR_ON_ENABLE) {
                    buf.zero_fill();
                }
            }
            slot => *slot = Some(FieldBuffer::zeroed(info.element_type, capacity)),
        }
    }

    /// Enable every slot of a field, its init shadow included.
    #[track_caller]
    pub fn add_particle_data<T: Element>(&mut self, handle: FieldHandle<T>) {
        for slot in handle.slots() {
            self.add_slot(FieldIndex(slot));
        }
        if let Some(init) = handle.init() {
            for slot in init.slots() {
                self.add_slot(FieldIndex(slot));
            }
        }
    }

    /// Disable every slot. Buffers are kept for reuse until
    /// [`trim`](Self::trim) or the next growth.
    pub fn reset_used_data(&mut self) {
        self.enabled.clear();
    }

    /// Free the buffers of disabled slots and shrink capacity to the
    /// occupied extent.
    pub fn trim(&mut self) {
        let new_capacity = align_up(self.extent());
        let extent = self.extent();
        let mut freed = 0usize;
        for (i, slot) in self.buffers.iter_mut().enumerate() {
            if !self.enabled.contains(FieldIndex(i as u32)) {
                if let Some(buf) = slot.take() {
                    freed += buf.memory_bytes();
                }
            } else if let Some(buf) = slot.as_mut() {
                if buf.capacity() != new_capacity {
                    buf.reallocate(new_capacity, extent);
                }
            }
        }
        tracing::debug!(
            old_capacity = self.capacity,
            new_capacity,
            freed_bytes = freed,
            "particle container trimmed"
        );
        self.capacity = new_capacity;
    }

    /// Grow so that at least `min_capacity` particles fit.
    ///
    /// Never shrinks. Capacity grows to `min + min(min / 2, capacity)`
    /// rounded up to the group stride, clamped to the configured maximum.
    /// The occupied extent, staged newborns included, is preserved.
    ///
    /// # Errors
    ///
    /// [`ContainerError::CapacityExceeded`] if `min_capacity` is above
    /// the configured maximum. The container is unchanged in that case.
    pub fn resize(&mut self, min_capacity: u32) -> Result<(), ContainerError> {
        if min_capacity <= self.capacity {
            return Ok(());
        }
        let max = self.config.max_capacity;
        if min_capacity > max {
            return Err(ContainerError::CapacityExceeded {
                requested: u64::from(min_capacity),
                max,
            });
        }
        let min = u64::from(min_capacity);
        let grown = min + (min / 2).min(u64::from(self.capacity));
        let stride = u64::from(GROUP_STRIDE);
        let new_capacity = (grown.div_ceil(stride) * stride).min(u64::from(max)) as u32;

        let extent = self.extent();
        for (i, slot) in self.buffers.iter_mut().enumerate() {
            if self.enabled.contains(FieldIndex(i as u32)) {
                if let Some(buf) = slot.as_mut() {
                    buf.reallocate(new_capacity, extent);
                }
            } else {
                *slot = None;
            }
        }
        tracing::debug!(
            old_capacity = self.capacity,
            new_capacity,
            "particle container grown"
        );
        self.capacity = new_capacity;
        Ok(())
    }

    /// Free everything and return to the freshly created state, except
    /// that capacity drops to zero.
    pub fn clear(&mut self) {
        tracing::debug!(
            live = self.live_count,
            bytes = self.memory_bytes(),
            "particle container cleared"
        );
        self.buffers.iter_mut().for_each(|b| *b = None);
        self.enabled.clear();
        self.capacity = 0;
        self.live_count = 0;
        self.spawn_begin = 0;
        self.spawn_end = 0;
        self.next_spawn_id = 0;
        self.last_commit = None;
    }

    // ── Spawning ──────────────────────────────────────────────────────

    /// Stage a batch of newborns and return their range.
    ///
    /// A batch staged while earlier newborns are still pending is appended
    /// after them. Otherwise the batch starts at the first group boundary
    /// at or after the live count. The built-in fields are written when
    /// enabled: parent ids, consecutive spawn ids (the id counter advances
    /// even when the field is disabled), ages `age_begin + i *
    /// age_increment` clamped to `>= 0` and fractions clamped to `<= 1`.
    ///
    /// An empty batch stages nothing and leaves pending newborns alone.
    ///
    /// # Errors
    ///
    /// [`ContainerError::CapacityExceeded`] if the batch does not fit in
    /// the configured maximum. Nothing is staged in that case.
    pub fn add_particles(&mut self, entries: &[SpawnEntry]) -> Result<IndexRange, ContainerError> {
        let total: u64 = entries.iter().map(|e| u64::from(e.count)).sum();
        if total == 0 {
            self.last_commit = None;
            if !self.has_new_born() {
                self.spawn_begin = self.live_count;
                self.spawn_end = self.live_count;
            }
            return Ok(IndexRange::empty_at(self.spawn_end));
        }

        let appending = self.has_new_born();
        let begin = if appending {
            self.spawn_end
        } else {
            align_up(self.live_count)
        };
        let end = u64::from(begin) + total;
        if end > u64::from(self.config.max_capacity) {
            return Err(ContainerError::CapacityExceeded {
                requested: end,
                max: self.config.max_capacity,
            });
        }
        let end = end as u32;
        self.resize(end)?;
        self.last_commit = None;

        let builtins = *self.schema.builtins();
        let mut cursor = begin;
        for entry in entries {
            let range = IndexRange::new(cursor, cursor + entry.count);
            if let Some(mut parents) = self.try_rw_stream(builtins.parent_id) {
                parents.fill(range, entry.parent_id);
            }
            let first_id = self.next_spawn_id;
            if let Some(mut ids) = self.try_rw_stream(builtins.spawn_id) {
                for (i, id) in range.iter().enumerate() {
                    ids.store(id, first_id.wrapping_add(i as u32));
                }
            }
            self.next_spawn_id = first_id.wrapping_add(entry.count);
            if let Some(mut ages) = self.try_rw_stream(builtins.normal_age) {
                for (i, id) in range.iter().enumerate() {
                    let age = entry.age_begin + i as f32 * entry.age_increment;
                    ages.store(id, age.max(0.0));
                }
            }
            if let Some(mut fractions) = self.try_rw_stream(builtins.spawn_fraction) {
                for (i, id) in range.iter().enumerate() {
                    let fraction = entry.fraction_begin + i as f32 * entry.fraction_increment;
                    fractions.store(id, fraction.min(1.0));
                }
            }
            cursor = range.end();
        }

        if !appending {
            self.spawn_begin = begin;
        }
        self.spawn_end = end;
        debug_assert!(self.spawn_end <= self.capacity);
        Ok(IndexRange::new(begin, end))
    }

    /// Commit the staged newborns into the live range.
    ///
    /// If a gap separates them from the live particles, the newborn block
    /// is moved down in every enabled slot first. The move is remembered
    /// so [`real_id`](Self::real_id) can translate indices cached while
    /// the batch was staged.
    pub fn reset_spawned_particles(&mut self) {
        if !self.has_new_born() {
            self.spawn_begin = self.live_count;
            self.spawn_end = self.live_count;
            return;
        }
        let staged = self.spawned_range();
        let count = staged.len();
        let shift = staged.begin() - self.live_count;
        let live = self.live_count;
        if shift > 0 {
            for buf in self.enabled_buffers_mut() {
                buf.shift_down(staged.begin(), live, count);
            }
        }
        tracing::trace!(count, shift, "newborns committed");
        self.last_commit = Some(CommitShift { staged, shift });
        self.live_count += count;
        self.spawn_begin = self.live_count;
        self.spawn_end = self.live_count;
    }

    /// Translate an index that may predate the last newborn move.
    ///
    /// While newborns are staged, an index inside the staged range maps to
    /// where that particle will live after the commit. After a commit,
    /// indices into the old staged range map to their committed position
    /// until the next spawn or removal. Other indices are returned as is.
    pub fn real_id(&self, id: ParticleId) -> ParticleId {
        if self.has_new_born() && self.spawned_range().contains(id) {
            return id - (self.spawn_begin - self.live_count);
        }
        match self.last_commit {
            Some(commit) if commit.staged.contains(id) => id - commit.shift,
            _ => id,
        }
    }

    // ── Removal ───────────────────────────────────────────────────────

    /// Remove live particles by swap-to-end compaction.
    ///
    /// `remove` must be ascending, duplicate-free and inside the live
    /// range (checked in debug builds). Survivors keep their values but
    /// not necessarily their indices. Buffers are not freed.
    pub fn remove_particles(&mut self, remove: &[ParticleId]) {
        if remove.is_empty() {
            return;
        }
        self.compact(remove);
    }

    /// Like [`remove_particles`](Self::remove_particles), also returning
    /// how indices moved.
    pub fn remove_particles_with_remap(&mut self, remove: &[ParticleId]) -> ParticleRemap {
        let plan = self.compact(remove);
        plan.remap(remove)
    }

    fn compact(&mut self, remove: &[ParticleId]) -> CompactionPlan {
        let plan = CompactionPlan::new(self.live_count, remove);
        for buf in self.enabled_buffers_mut() {
            buf.apply_moves(&plan.moves);
        }
        tracing::trace!(
            removed = remove.len(),
            moved = plan.moves.len(),
            live = plan.new_live,
            "particles compacted"
        );
        self.live_count = plan.new_live;
        self.last_commit = None;
        if !self.has_new_born() {
            self.spawn_begin = self.live_count;
            self.spawn_end = self.live_count;
        }
        plan
    }

    // ── Bulk copies ───────────────────────────────────────────────────

    /// Copy `range` of slot `src` into slot `dst`.
    ///
    /// # Panics
    ///
    /// Panics if either slot is disabled or their element types differ.
    #[track_caller]
    pub fn copy_slots(&mut self, dst: FieldIndex, src: FieldIndex, range: IndexRange) {
        if dst == src || range.is_empty() {
            return;
        }
        assert!(
            self.enabled.contains(dst) && self.enabled.contains(src),
            "copy between slots {src} -> {dst} requires both to be enabled"
        );
        let (d, s) = (dst.as_usize(), src.as_usize());
        let (dst_buf, src_buf) = if d < s {
            let (lo, hi) = self.buffers.split_at_mut(s);
            (lo[d].as_mut(), hi[0].as_ref())
        } else {
            let (lo, hi) = self.buffers.split_at_mut(d);
            (hi[0].as_mut(), lo[s].as_ref())
        };
        match (dst_buf, src_buf) {
            (Some(dst_buf), Some(src_buf)) => {
                assert_eq!(
                    dst_buf.element_type(),
                    src_buf.element_type(),
                    "copy between slots of different element types"
                );
                dst_buf.copy_range_from(src_buf, range.begin(), range.end());
            }
            _ => panic!("enabled slot without a buffer"),
        }
    }

    /// Fill the init shadow of a field from its current values.
    ///
    /// # Panics
    ///
    /// Panics if the field has no init shadow or is disabled.
    #[track_caller]
    pub fn init_from_current<T: Element>(&mut self, handle: FieldHandle<T>, range: IndexRange) {
        let Some(init) = handle.init() else {
            panic!("{handle:?} has no init slot");
        };
        for (current, shadow) in handle.slots().zip(init.slots()) {
            self.copy_slots(FieldIndex(shadow), FieldIndex(current), range);
        }
    }

    // ── Streams ───────────────────────────────────────────────────────

    /// Read stream over a scalar field. Disabled fields read as `default`.
    pub fn read_stream<T: Element>(&self, handle: FieldHandle<T>, default: T) -> ReadStream<'_, T> {
        let data = self.enabled_buffer(handle.index()).map(FieldBuffer::typed::<T>);
        ReadStream::new(data, default, self.occupied())
    }

    /// Read/write stream over a scalar field, or `None` if it is disabled.
    pub fn try_rw_stream<T: Element>(&mut self, handle: FieldHandle<T>) -> Option<ReadWriteStream<'_, T>> {
        let index = handle.index();
        if !self.enabled.contains(index) {
            return None;
        }
        self.buffers[index.as_usize()]
            .as_mut()
            .map(|buf| ReadWriteStream::new(buf.typed_mut::<T>()))
    }

    /// Read/write stream over an enabled scalar field.
    ///
    /// # Panics
    ///
    /// Panics if the field is disabled.
    #[track_caller]
    pub fn rw_stream<T: Element>(&mut self, handle: FieldHandle<T>) -> ReadWriteStream<'_, T> {
        match self.try_rw_stream(handle) {
            Some(stream) => stream,
            None => panic!("write stream requested for disabled field {handle:?}"),
        }
    }

    /// Read stream over a three-component float field.
    #[track_caller]
    pub fn vec3_stream(&self, handle: FieldHandle<f32>, default: Vec3) -> Vec3Stream<'_> {
        check_dimension(&handle, 3);
        Vec3Stream::new(
            self.read_stream(handle.component(0), default.x),
            self.read_stream(handle.component(1), default.y),
            self.read_stream(handle.component(2), default.z),
        )
    }

    /// Read/write stream over an enabled three-component float field.
    #[track_caller]
    pub fn vec3_rw_stream(&mut self, handle: FieldHandle<f32>) -> Vec3RwStream<'_> {
        self.streams().write_vec3(handle)
    }

    /// Read stream over a quaternion field.
    #[track_caller]
    pub fn quat_stream(&self, handle: FieldHandle<f32>, default: Quat) -> QuatStream<'_> {
        check_dimension(&handle, 4);
        let d = default.to_array();
        QuatStream::new([
            self.read_stream(handle.component(0), d[0]),
            self.read_stream(handle.component(1), d[1]),
            self.read_stream(handle.component(2), d[2]),
            self.read_stream(handle.component(3), d[3]),
        ])
    }

    /// Read/write stream over an enabled quaternion field.
    #[track_caller]
    pub fn quat_rw_stream(&mut self, handle: FieldHandle<f32>) -> QuatRwStream<'_> {
        self.streams().write_quat(handle)
    }

    /// Borrow several streams at once.
    pub fn streams(&mut self) -> StreamAccess<'_> {
        let occupied = self.occupied();
        let enabled = &self.enabled;
        StreamAccess::new(
            self.buffers.iter_mut().enumerate().map(move |(i, buf)| {
                if enabled.contains(FieldIndex(i as u32)) {
                    buf.as_mut()
                } else {
                    None
                }
            }),
            occupied,
        )
    }
}
