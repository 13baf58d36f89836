//! Core value types for telemetry data.

mod bitfield;
mod value;
mod variable_type;

pub use bitfield::BitField;
pub use value::TelemetryValue;
pub use variable_type::VariableType;
