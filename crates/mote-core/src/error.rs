//! Schema construction errors.
//!
//! These surface while a schema is being assembled, before any container
//! exists. Per-frame container operations never produce them.

use std::error::Error;
use std::fmt;

use crate::field::{ElementType, FieldShape};

/// Errors raised while registering or looking up fields in a schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaError {
    /// A field was registered twice under the same name with different shapes.
    Conflict {
        /// The contested name.
        name: String,
        /// Shape of the earlier registration.
        existing: FieldShape,
        /// Shape of the rejected registration.
        requested: FieldShape,
    },
    /// A dimension outside `1..=4` was requested.
    InvalidDimension {
        /// Field name.
        name: String,
        /// The rejected dimension.
        dimension: u8,
    },
    /// No field with this name exists in the schema.
    UnknownField {
        /// The missing name.
        name: String,
    },
    /// A typed lookup asked for the wrong element type.
    TypeMismatch {
        /// Field name.
        name: String,
        /// Type the caller asked for.
        expected: ElementType,
        /// Type the field was registered with.
        found: ElementType,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict {
                name,
                existing,
                requested,
            } => {
                write!(
                    f,
                    "field '{name}' already registered as {existing}, cannot re-register as {requested}"
                )
            }
            Self::InvalidDimension { name, dimension } => {
                write!(f, "field '{name}' has invalid dimension {dimension} (expected 1..=4)")
            }
            Self::UnknownField { name } => write!(f, "unknown field '{name}'"),
            Self::TypeMismatch {
                name,
                expected,
                found,
            } => {
                write!(f, "field '{name}' holds {found}, requested as {expected}")
            }
        }
    }
}

impl Error for SchemaError {}
