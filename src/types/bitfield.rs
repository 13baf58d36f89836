//! BitField type for the simulator's flag variables.

use serde::{Deserialize, Serialize};

/// A 32-bit bit field read from telemetry (engine warnings, session flags,
/// camera state and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField(pub u32);

impl BitField {
    /// Create a new BitField from a raw value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit index is set.
    pub fn is_set(&self, bit: u32) -> bool {
        (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of `flag` is set.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Get the raw value.
    pub fn value(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_queries() {
        let bits = BitField::new(0b1010);
        assert!(bits.is_set(1));
        assert!(bits.is_set(3));
        assert!(!bits.is_set(0));
        assert!(bits.has_flag(0x8));
        assert!(!bits.has_flag(0x4));
        assert_eq!(bits.value(), 10);
    }
}
