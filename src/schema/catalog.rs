//! Variable descriptor table decoding.
//!
//! The header points at a table of fixed-stride descriptor records, one per
//! telemetry variable:
//!
//! | Offset | Field       | Size |
//! |--------|-------------|------|
//! | 0      | type tag    | 4    |
//! | 4      | offset      | 4    |
//! | 8      | count       | 4    |
//! | 16     | name        | 32   |
//! | 48     | description | 64   |
//! | 112    | unit        | 32   |
//!
//! The table is discovered at runtime, decoded exactly once per mapping, and
//! cached as an immutable [`VariableCatalog`] for that mapping's lifetime. A
//! fresh catalog is built only when the supervisor acquires a new mapping
//! (simulator restarted).

use crate::schema::header::HeaderView;
use crate::text::TextDecoder;
use crate::types::VariableType;
use crate::{Result, SdkError};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Stride of one variable descriptor record.
pub const VAR_DESCRIPTOR_LEN: usize = 144;

const NAME_OFFSET: usize = 16;
const NAME_LEN: usize = 32;
const DESC_OFFSET: usize = 48;
const DESC_LEN: usize = 64;
const UNIT_OFFSET: usize = 112;
const UNIT_LEN: usize = 32;

/// Decoded metadata for one telemetry variable.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescriptor {
    /// Variable name as published by the simulator.
    pub name: String,
    /// Value type of each element.
    pub var_type: VariableType,
    /// Byte offset within the active telemetry buffer.
    pub offset: usize,
    /// Number of elements (1 for scalars).
    pub count: usize,
    /// Units of measurement (e.g. "m/s", "rpm").
    pub unit: String,
    /// Human-readable description.
    pub description: String,
}

impl VariableDescriptor {
    /// Total byte length of the variable (element width times count).
    pub fn byte_len(&self) -> usize {
        self.var_type.size() * self.count
    }
}

/// Identity of the variable table a catalog was built from.
///
/// Used to detect a producer that relaunched behind a still-mapped region:
/// when these fields change, the descriptors are stale and the mapping must
/// be reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogGeneration {
    pub var_count: i32,
    pub var_table_offset: i32,
    pub buffer_len: i32,
}

impl CatalogGeneration {
    fn of(header: &HeaderView<'_>) -> Self {
        Self {
            var_count: header.var_count(),
            var_table_offset: header.var_table_offset(),
            buffer_len: header.buffer_len(),
        }
    }
}

/// Immutable, name-keyed variable lookup for one mapping generation.
#[derive(Debug, Clone)]
pub struct VariableCatalog {
    // Keys are lowercased; lookup is case-insensitive.
    variables: HashMap<String, VariableDescriptor>,
    buffer_len: usize,
    generation: CatalogGeneration,
}

impl VariableCatalog {
    /// Decode the descriptor table referenced by `header`.
    ///
    /// Descriptors with an empty name, a zero count, or an unknown type tag
    /// are skipped with a warning — they are unused slots or producer bugs,
    /// not reasons to reject the whole mapping. A table that extends past the
    /// region is truncated to the records that fit.
    pub fn build(header: &HeaderView<'_>, decoder: &TextDecoder) -> Result<Self> {
        let memory = header.memory();
        let count = header.var_count();
        let table_offset = header.var_table_offset();

        if count < 0 || table_offset < 0 {
            return Err(SdkError::parse(
                "variable table",
                format!("negative count ({count}) or offset ({table_offset})"),
            ));
        }

        let table_offset = table_offset as usize;
        // Cap the pre-allocation hint at what the region can hold; the
        // declared count is untrusted and the loop truncates to fit anyway.
        let capacity = (count as usize)
            .min(memory.len().saturating_sub(table_offset) / VAR_DESCRIPTOR_LEN);
        let mut variables = HashMap::with_capacity(capacity);

        for i in 0..count as usize {
            let base = table_offset + i * VAR_DESCRIPTOR_LEN;
            let Some(record) = memory.get(base..base + VAR_DESCRIPTOR_LEN) else {
                warn!(index = i, total = count, "Variable table extends past the mapped region");
                break;
            };

            let raw_type = read_i32(record, 0);
            let offset = read_i32(record, 4);
            let var_count = read_i32(record, 8);
            let name = decoder.decode_fixed(&record[NAME_OFFSET..NAME_OFFSET + NAME_LEN]);

            if name.is_empty() || var_count <= 0 || offset < 0 {
                continue;
            }

            let Some(var_type) = VariableType::from_raw(raw_type) else {
                warn!(name = %name, raw_type, "Unknown variable type tag, skipping");
                continue;
            };

            let descriptor = VariableDescriptor {
                var_type,
                offset: offset as usize,
                count: var_count as usize,
                unit: decoder.decode_fixed(&record[UNIT_OFFSET..UNIT_OFFSET + UNIT_LEN]),
                description: decoder.decode_fixed(&record[DESC_OFFSET..DESC_OFFSET + DESC_LEN]),
                name,
            };

            let key = descriptor.name.to_ascii_lowercase();
            if let Some(previous) = variables.insert(key, descriptor) {
                warn!(name = %previous.name, "Duplicate variable name, keeping the later record");
            }
        }

        debug!(
            decoded = variables.len(),
            declared = count,
            buffer_len = header.buffer_len(),
            "Built variable catalog"
        );

        Ok(Self {
            variables,
            buffer_len: header.buffer_len().max(0) as usize,
            generation: CatalogGeneration::of(header),
        })
    }

    /// Look up a variable by name, case-insensitively. O(1) average.
    ///
    /// Absence is not an error at this layer; the accessor surfaces it as a
    /// `None` read.
    pub fn get(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.get(&name.to_ascii_lowercase())
    }

    /// Whether a variable exists in this catalog generation.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of decoded variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True when no variables were decoded.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate all descriptors, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.values()
    }

    /// Byte length of one telemetry buffer in this generation.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Whether the live header still describes the table this catalog was
    /// built from. A mismatch means the producer relaunched and the catalog
    /// is a stale generation.
    pub fn matches_generation(&self, header: &HeaderView<'_>) -> bool {
        self.generation == CatalogGeneration::of(header)
    }
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_image::{MemoryImage, VarImage};

    fn build_catalog(image: &MemoryImage) -> (Vec<u8>, VariableCatalog) {
        let memory = image.build();
        let header = HeaderView::new(&memory).unwrap();
        let catalog = VariableCatalog::build(&header, &TextDecoder::windows_1252()).unwrap();
        (memory, catalog)
    }

    #[test]
    fn decodes_descriptor_fields() {
        let mut var = VarImage::new(4, 8, 1, "Speed");
        var.unit = "m/s".to_string();
        var.description = "GPS vehicle speed".to_string();
        let image = MemoryImage::new(vec![var], vec![0u8; 64]);
        let (_memory, catalog) = build_catalog(&image);

        let speed = catalog.get("Speed").expect("Speed should be decoded");
        assert_eq!(speed.name, "Speed");
        assert_eq!(speed.var_type, VariableType::Float32);
        assert_eq!(speed.offset, 8);
        assert_eq!(speed.count, 1);
        assert_eq!(speed.unit, "m/s");
        assert_eq!(speed.description, "GPS vehicle speed");
        assert_eq!(speed.byte_len(), 4);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let image = MemoryImage::new(vec![VarImage::new(2, 0, 1, "SessionNum")], vec![0u8; 16]);
        let (_memory, catalog) = build_catalog(&image);

        assert!(catalog.contains("SessionNum"));
        assert!(catalog.contains("sessionnum"));
        assert!(catalog.contains("SESSIONNUM"));
        assert_eq!(catalog.get("sessionNUM").unwrap().name, "SessionNum");
    }

    #[test]
    fn skips_unused_and_malformed_slots() {
        let image = MemoryImage::new(
            vec![
                VarImage::new(4, 0, 1, "Good"),
                VarImage::new(4, 4, 1, ""),     // unused slot
                VarImage::new(9, 8, 1, "Odd"),  // unknown type tag
                VarImage::new(4, 12, 0, "Zero"), // zero count
                VarImage::new(4, -4, 1, "Neg"), // negative offset
            ],
            vec![0u8; 64],
        );
        let (_memory, catalog) = build_catalog(&image);

        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("Good"));
        assert!(!catalog.contains("Odd"));
    }

    #[test]
    fn truncated_table_keeps_records_that_fit() {
        let image = MemoryImage::new(
            vec![VarImage::new(2, 0, 1, "First"), VarImage::new(2, 4, 1, "Second")],
            vec![],
        );
        let mut memory = image.build();
        // Drop the trailing bytes of the second record.
        memory.truncate(memory.len() - 10);

        let header = HeaderView::new(&memory).unwrap();
        let catalog = VariableCatalog::build(&header, &TextDecoder::windows_1252()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains("First"));
    }

    #[test]
    fn generation_tracks_table_identity() {
        let image = MemoryImage::new(vec![VarImage::new(2, 0, 1, "A")], vec![0u8; 8]);
        let memory = image.build();
        let header = HeaderView::new(&memory).unwrap();
        let catalog = VariableCatalog::build(&header, &TextDecoder::windows_1252()).unwrap();
        assert!(catalog.matches_generation(&header));

        // A relaunched producer declares a different variable count.
        let other = MemoryImage::new(
            vec![VarImage::new(2, 0, 1, "A"), VarImage::new(2, 4, 1, "B")],
            vec![0u8; 8],
        )
        .build();
        let other_header = HeaderView::new(&other).unwrap();
        assert!(!catalog.matches_generation(&other_header));
    }
}
