//! Telemetry variable type enumeration.

use serde::{Deserialize, Serialize};

/// Value type of a telemetry variable, matching the simulator's on-disk enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// A single character (one byte in the fixed code page).
    Char,
    /// A boolean stored as one byte.
    Bool,
    /// A 32-bit signed integer.
    Int32,
    /// A 32-bit bit field.
    BitField,
    /// A single-precision floating point number.
    Float32,
    /// A double-precision floating point number.
    Float64,
}

impl VariableType {
    /// Map the raw type tag from a variable descriptor.
    ///
    /// Returns `None` for tags outside the simulator's enum; the catalog
    /// skips such descriptors rather than guessing at a width.
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(VariableType::Char),
            1 => Some(VariableType::Bool),
            2 => Some(VariableType::Int32),
            3 => Some(VariableType::BitField),
            4 => Some(VariableType::Float32),
            5 => Some(VariableType::Float64),
            _ => None,
        }
    }

    /// Byte width of one element of this type.
    pub fn size(&self) -> usize {
        match self {
            VariableType::Char | VariableType::Bool => 1,
            VariableType::Int32 | VariableType::BitField | VariableType::Float32 => 4,
            VariableType::Float64 => 8,
        }
    }
}
