//! Tagged value for untyped reads.

use super::BitField;

/// A telemetry value whose type was dispatched from the catalog rather than
/// requested by the caller.
///
/// Scalar descriptors (count == 1) yield scalar variants; array descriptors
/// yield the corresponding vector variant. `Char` variables always decode to
/// a string of their full element count.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    String(String),
    Bool(bool),
    BoolArray(Vec<bool>),
    Int32(i32),
    Int32Array(Vec<i32>),
    BitField(BitField),
    BitFieldArray(Vec<BitField>),
    Float32(f32),
    Float32Array(Vec<f32>),
    Float64(f64),
    Float64Array(Vec<f64>),
}
