//! The particle data type registry.
//!
//! Features register the per-particle fields they need on a
//! [`SchemaBuilder`]; the builder is then sealed into an immutable
//! [`Schema`] shared (via `Arc`) by every container of that schema.
//! Sealing consumes the builder, so no field can be added once a
//! container may exist.
//!
//! # Slot layout
//!
//! Every field owns `dimension` consecutive scalar slots. A field flagged
//! [`FieldFlags::INIT_SLOT`] owns another `dimension` slots right after
//! them for its init shadow:
//!
//! ```text
//! slot:   0          1         2           3               4  5  6  7  8  9
//!         parent_id  spawn_id  normal_age  spawn_fraction  x  y  z  x0 y0 z0
//!                                                          └ position ┘└ init ┘
//! ```

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::SchemaError;
use crate::field::{Element, ElementType, FieldDescriptor, FieldFlags, FieldHandle, FieldShape};
use crate::id::FieldIndex;

/// Largest supported field dimension (quaternions).
pub const MAX_DIMENSION: u8 = 4;

/// Per-slot metadata, indexed by [`FieldIndex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotInfo {
    /// Registration ordinal of the owning field.
    pub field: usize,
    /// Component number within the field.
    pub component: u8,
    /// Whether this slot belongs to the init shadow.
    pub is_init: bool,
    /// Scalar type stored in the slot.
    pub element_type: ElementType,
    /// Flags of the owning field.
    pub flags: FieldFlags,
}

impl SlotInfo {
    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_type.size()
    }
}

/// Fields every schema carries because the container writes them itself
/// while spawning.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinFields {
    /// Index of the spawning particle in the parent container.
    pub parent_id: FieldHandle<u32>,
    /// Monotonic birth-order id.
    pub spawn_id: FieldHandle<u32>,
    /// Age normalized to the particle lifetime, `0` at birth.
    pub normal_age: FieldHandle<f32>,
    /// Position of the particle within its spawn batch, `0..=1`.
    pub spawn_fraction: FieldHandle<f32>,
}

/// Mutable registry used while features declare their fields.
#[derive(Debug)]
pub struct SchemaBuilder {
    fields: IndexMap<String, FieldDescriptor>,
    slots: Vec<SlotInfo>,
    builtins: BuiltinFields,
}

impl SchemaBuilder {
    /// Name of the built-in parent id field.
    pub const PARENT_ID: &'static str = "parent_id";
    /// Name of the built-in spawn id field.
    pub const SPAWN_ID: &'static str = "spawn_id";
    /// Name of the built-in normalized age field.
    pub const NORMAL_AGE: &'static str = "normal_age";
    /// Name of the built-in spawn fraction field.
    pub const SPAWN_FRACTION: &'static str = "spawn_fraction";

    /// Create a builder pre-populated with the [`BuiltinFields`].
    pub fn new() -> Self {
        let mut builder = Self {
            fields: IndexMap::new(),
            slots: Vec::new(),
            builtins: BuiltinFields {
                parent_id: FieldHandle::new(FieldIndex(0), 1, FieldFlags::empty()),
                spawn_id: FieldHandle::new(FieldIndex(0), 1, FieldFlags::empty()),
                normal_age: FieldHandle::new(FieldIndex(0), 1, FieldFlags::empty()),
                spawn_fraction: FieldHandle::new(FieldIndex(0), 1, FieldFlags::empty()),
            },
        };
        let scalar = |element_type| FieldShape {
            element_type,
            dimension: 1,
            flags: FieldFlags::empty(),
        };
        let parent = builder.push_field(Self::PARENT_ID, scalar(ElementType::U32));
        let spawn = builder.push_field(Self::SPAWN_ID, scalar(ElementType::U32));
        let age = builder.push_field(Self::NORMAL_AGE, scalar(ElementType::F32));
        let fraction = builder.push_field(Self::SPAWN_FRACTION, scalar(ElementType::F32));
        builder.builtins = BuiltinFields {
            parent_id: FieldHandle::new(parent, 1, FieldFlags::empty()),
            spawn_id: FieldHandle::new(spawn, 1, FieldFlags::empty()),
            normal_age: FieldHandle::new(age, 1, FieldFlags::empty()),
            spawn_fraction: FieldHandle::new(fraction, 1, FieldFlags::empty()),
        };
        builder
    }

    /// Register a typed field.
    ///
    /// Registering an existing name with an identical shape returns the
    /// existing handle, so independently written features may declare the
    /// same field.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Conflict`] if the name exists with another shape,
    /// [`SchemaError::InvalidDimension`] if `dimension` is not in `1..=4`.
    pub fn register<T: Element>(
        &mut self,
        name: &str,
        dimension: u8,
        flags: FieldFlags,
    ) -> Result<FieldHandle<T>, SchemaError> {
        let index = self.register_raw(name, T::TYPE, dimension, flags)?;
        Ok(FieldHandle::new(index, dimension, flags))
    }

    /// Register a field whose element type is only known at runtime.
    ///
    /// Same idempotence and error rules as [`SchemaBuilder::register`].
    pub fn register_raw(
        &mut self,
        name: &str,
        element_type: ElementType,
        dimension: u8,
        flags: FieldFlags,
    ) -> Result<FieldIndex, SchemaError> {
        if dimension == 0 || dimension > MAX_DIMENSION {
            return Err(SchemaError::InvalidDimension {
                name: name.to_string(),
                dimension,
            });
        }
        let shape = FieldShape {
            element_type,
            dimension,
            flags,
        };
        if let Some(existing) = self.fields.get(name) {
            if existing.shape == shape {
                return Ok(existing.index);
            }
            return Err(SchemaError::Conflict {
                name: name.to_string(),
                existing: existing.shape,
                requested: shape,
            });
        }
        Ok(self.push_field(name, shape))
    }

    /// Built-in field handles.
    pub fn builtins(&self) -> &BuiltinFields {
        &self.builtins
    }

    /// Number of slots registered so far.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Seal the registry.
    pub fn build(self) -> Arc<Schema> {
        tracing::debug!(
            fields = self.fields.len(),
            slots = self.slots.len(),
            "particle schema sealed"
        );
        Arc::new(Schema {
            fields: self.fields,
            slots: self.slots,
            builtins: self.builtins,
        })
    }

    fn push_field(&mut self, name: &str, shape: FieldShape) -> FieldIndex {
        let index = FieldIndex(self.slots.len() as u32);
        let ordinal = self.fields.len();
        for is_init in [false, true] {
            if is_init && !shape.flags.contains(FieldFlags::INIT_SLOT) {
                break;
            }
            for component in 0..shape.dimension {
                self.slots.push(SlotInfo {
                    field: ordinal,
                    component,
                    is_init,
                    element_type: shape.element_type,
                    flags: shape.flags,
                });
            }
        }
        self.fields.insert(
            name.to_string(),
            FieldDescriptor {
                name: name.to_string(),
                index,
                shape,
            },
        );
        index
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A sealed, immutable field registry.
#[derive(Debug)]
pub struct Schema {
    fields: IndexMap<String, FieldDescriptor>,
    slots: Vec<SlotInfo>,
    builtins: BuiltinFields,
}

impl Schema {
    /// Descriptor of the field owning `index` (any of its slots). O(1).
    pub fn descriptor(&self, index: FieldIndex) -> Option<&FieldDescriptor> {
        let slot = self.slots.get(index.as_usize())?;
        self.fields.get_index(slot.field).map(|(_, desc)| desc)
    }

    /// Descriptor by registration name.
    pub fn lookup(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Typed handle by registration name.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownField`] or [`SchemaError::TypeMismatch`].
    pub fn handle<T: Element>(&self, name: &str) -> Result<FieldHandle<T>, SchemaError> {
        let desc = self.lookup(name).ok_or_else(|| SchemaError::UnknownField {
            name: name.to_string(),
        })?;
        if desc.shape.element_type != T::TYPE {
            return Err(SchemaError::TypeMismatch {
                name: name.to_string(),
                expected: T::TYPE,
                found: desc.shape.element_type,
            });
        }
        Ok(FieldHandle::new(desc.index, desc.dimension(), desc.flags()))
    }

    /// Metadata of one slot.
    pub fn slot(&self, index: FieldIndex) -> Option<&SlotInfo> {
        self.slots.get(index.as_usize())
    }

    /// All slots in index order.
    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    /// Total number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered fields (built-ins included).
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over field descriptors in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Built-in field handles.
    pub fn builtins(&self) -> &BuiltinFields {
        &self.builtins
    }
}
