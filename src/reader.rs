//! Typed, bounds-checked reads over the active telemetry buffer.
//!
//! [`DataReader`] is the only layer that touches telemetry bytes, and it
//! never trusts the producer: every read is a checked slice access against
//! the mapped region's known length, never a pointer cast past it. A read
//! that cannot be satisfied — unknown name, type mismatch, or a computed
//! range outside the region — yields `None` rather than an error, because
//! the producer may be mid-rewrite and absence is an expected, recoverable
//! condition.

use crate::schema::{HeaderView, VariableCatalog, VariableDescriptor};
use crate::text::TextDecoder;
use crate::types::{BitField, TelemetryValue, VariableType};

/// Read-only accessor bound to one snapshot's active buffer.
#[derive(Debug, Clone, Copy)]
pub struct DataReader<'a> {
    memory: &'a [u8],
    catalog: &'a VariableCatalog,
    buffer_offset: usize,
    decoder: TextDecoder,
}

impl<'a> DataReader<'a> {
    /// Bind an accessor to an explicit buffer offset.
    pub fn new(
        memory: &'a [u8],
        catalog: &'a VariableCatalog,
        buffer_offset: usize,
        decoder: TextDecoder,
    ) -> Self {
        Self { memory, catalog, buffer_offset, decoder }
    }

    /// Bind an accessor to the freshest buffer the header currently reports.
    pub fn latest(header: &HeaderView<'a>, catalog: &'a VariableCatalog, decoder: TextDecoder) -> Self {
        Self::new(header.memory(), catalog, header.active_buffer_offset(), decoder)
    }

    /// The catalog this accessor resolves names against.
    pub fn catalog(&self) -> &'a VariableCatalog {
        self.catalog
    }

    /// Byte offset of the buffer this accessor is bound to.
    pub fn buffer_offset(&self) -> usize {
        self.buffer_offset
    }

    /// Read a boolean variable. Arrays yield their first element.
    pub fn try_read_bool(&self, name: &str) -> Option<bool> {
        let bytes = self.scalar_bytes(name, VariableType::Bool)?;
        Some(bytes[0] != 0)
    }

    /// Read a boolean array variable in full.
    pub fn try_read_bool_array(&self, name: &str) -> Option<Vec<bool>> {
        let (desc, bytes) = self.field_bytes(name, VariableType::Bool)?;
        Some((0..desc.count).map(|i| bytes[i] != 0).collect())
    }

    /// Read a 32-bit integer variable. Arrays yield their first element.
    pub fn try_read_i32(&self, name: &str) -> Option<i32> {
        let bytes = self.scalar_bytes(name, VariableType::Int32)?;
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a 32-bit integer array variable in full.
    pub fn try_read_i32_array(&self, name: &str) -> Option<Vec<i32>> {
        let (desc, bytes) = self.field_bytes(name, VariableType::Int32)?;
        Some(read_le_array(bytes, desc.count, |b: [u8; 4]| i32::from_le_bytes(b)))
    }

    /// Read a bit-field variable. Arrays yield their first element.
    pub fn try_read_bitfield(&self, name: &str) -> Option<BitField> {
        let bytes = self.scalar_bytes(name, VariableType::BitField)?;
        Some(BitField(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
    }

    /// Read a bit-field array variable in full.
    pub fn try_read_bitfield_array(&self, name: &str) -> Option<Vec<BitField>> {
        let (desc, bytes) = self.field_bytes(name, VariableType::BitField)?;
        Some(read_le_array(bytes, desc.count, |b: [u8; 4]| BitField(u32::from_le_bytes(b))))
    }

    /// Read a single-precision float variable. Arrays yield their first element.
    pub fn try_read_f32(&self, name: &str) -> Option<f32> {
        let bytes = self.scalar_bytes(name, VariableType::Float32)?;
        Some(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a single-precision float array variable in full.
    pub fn try_read_f32_array(&self, name: &str) -> Option<Vec<f32>> {
        let (desc, bytes) = self.field_bytes(name, VariableType::Float32)?;
        Some(read_le_array(bytes, desc.count, |b: [u8; 4]| f32::from_le_bytes(b)))
    }

    /// Read a double-precision float variable. Arrays yield their first element.
    pub fn try_read_f64(&self, name: &str) -> Option<f64> {
        let bytes = self.scalar_bytes(name, VariableType::Float64)?;
        Some(f64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Read a double-precision float array variable in full.
    pub fn try_read_f64_array(&self, name: &str) -> Option<Vec<f64>> {
        let (desc, bytes) = self.field_bytes(name, VariableType::Float64)?;
        Some(read_le_array(bytes, desc.count, |b: [u8; 8]| f64::from_le_bytes(b)))
    }

    /// Read a character variable as a string.
    ///
    /// The value is decoded with the fixed code page and trimmed at the first
    /// NUL or the declared element count, whichever comes first.
    pub fn try_read_string(&self, name: &str) -> Option<String> {
        let (_, bytes) = self.field_bytes(name, VariableType::Char)?;
        Some(self.decoder.decode_fixed(bytes))
    }

    /// Read any variable, dispatching on the catalog's type tag.
    pub fn try_read_value(&self, name: &str) -> Option<TelemetryValue> {
        let desc = self.catalog.get(name)?;
        let value = match (desc.var_type, desc.count > 1) {
            (VariableType::Char, _) => TelemetryValue::String(self.try_read_string(name)?),
            (VariableType::Bool, false) => TelemetryValue::Bool(self.try_read_bool(name)?),
            (VariableType::Bool, true) => TelemetryValue::BoolArray(self.try_read_bool_array(name)?),
            (VariableType::Int32, false) => TelemetryValue::Int32(self.try_read_i32(name)?),
            (VariableType::Int32, true) => TelemetryValue::Int32Array(self.try_read_i32_array(name)?),
            (VariableType::BitField, false) => TelemetryValue::BitField(self.try_read_bitfield(name)?),
            (VariableType::BitField, true) => {
                TelemetryValue::BitFieldArray(self.try_read_bitfield_array(name)?)
            }
            (VariableType::Float32, false) => TelemetryValue::Float32(self.try_read_f32(name)?),
            (VariableType::Float32, true) => {
                TelemetryValue::Float32Array(self.try_read_f32_array(name)?)
            }
            (VariableType::Float64, false) => TelemetryValue::Float64(self.try_read_f64(name)?),
            (VariableType::Float64, true) => {
                TelemetryValue::Float64Array(self.try_read_f64_array(name)?)
            }
        };
        Some(value)
    }

    /// Resolve a descriptor and the full checked byte range of its value.
    fn field_bytes(&self, name: &str, expected: VariableType) -> Option<(&VariableDescriptor, &'a [u8])> {
        let desc = self.catalog.get(name)?;
        if desc.var_type != expected {
            return None;
        }

        let total = desc.var_type.size().checked_mul(desc.count)?;
        let start = self.buffer_offset.checked_add(desc.offset)?;
        let end = start.checked_add(total)?;

        // The value must fit inside the declared buffer as well as the
        // region; exceeding the buffer is a producer-contract violation.
        if desc.offset.checked_add(total)? > self.catalog.buffer_len() {
            return None;
        }

        self.memory.get(start..end).map(|bytes| (desc, bytes))
    }

    /// Like [`field_bytes`](Self::field_bytes) but narrowed to the first element.
    fn scalar_bytes(&self, name: &str, expected: VariableType) -> Option<&'a [u8]> {
        let (desc, bytes) = self.field_bytes(name, expected)?;
        bytes.get(..desc.var_type.size())
    }
}

fn read_le_array<const N: usize, T>(bytes: &[u8], count: usize, convert: impl Fn([u8; N]) -> T) -> Vec<T> {
    (0..count)
        .map(|i| {
            let mut chunk = [0u8; N];
            chunk.copy_from_slice(&bytes[i * N..(i + 1) * N]);
            convert(chunk)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_image::{MemoryImage, VarImage};
    use proptest::prelude::*;

    fn sample_image() -> MemoryImage {
        let mut buffer = vec![0u8; 64];
        buffer[8..12].copy_from_slice(&3.0f32.to_le_bytes()); // Speed
        buffer[12..16].copy_from_slice(&9000i32.to_le_bytes()); // SessionNum
        buffer[16] = 1; // OnPitRoad
        buffer[20..24].copy_from_slice(&0x12u32.to_le_bytes()); // SessionFlags
        buffer[24..32].copy_from_slice(&101.5f64.to_le_bytes()); // SessionTime
        for (i, v) in [1.0f32, 2.0, 3.0, 4.0].iter().enumerate() {
            buffer[32 + i * 4..36 + i * 4].copy_from_slice(&v.to_le_bytes()); // TirePressures
        }
        buffer[48..53].copy_from_slice(b"P12\0\0"); // Gear label

        MemoryImage::new(
            vec![
                VarImage::new(4, 8, 1, "Speed"),
                VarImage::new(2, 12, 1, "SessionNum"),
                VarImage::new(1, 16, 1, "OnPitRoad"),
                VarImage::new(3, 20, 1, "SessionFlags"),
                VarImage::new(5, 24, 1, "SessionTime"),
                VarImage::new(4, 32, 4, "TirePressures"),
                VarImage::new(0, 48, 5, "PitLabel"),
                VarImage::new(4, 60, 4, "Overhang"), // 16 bytes declared, 4 available
            ],
            buffer,
        )
    }

    fn with_reader<R>(image: &MemoryImage, f: impl FnOnce(DataReader<'_>) -> R) -> R {
        let memory = image.build();
        let header = HeaderView::new(&memory).unwrap();
        let catalog = VariableCatalog::build(&header, &TextDecoder::windows_1252()).unwrap();
        f(DataReader::latest(&header, &catalog, TextDecoder::windows_1252()))
    }

    #[test]
    fn reads_each_supported_type() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_f32("Speed"), Some(3.0));
            assert_eq!(reader.try_read_i32("SessionNum"), Some(9000));
            assert_eq!(reader.try_read_bool("OnPitRoad"), Some(true));
            assert_eq!(reader.try_read_bitfield("SessionFlags"), Some(BitField(0x12)));
            assert_eq!(reader.try_read_f64("SessionTime"), Some(101.5));
            assert_eq!(reader.try_read_f32_array("TirePressures"), Some(vec![1.0, 2.0, 3.0, 4.0]));
            assert_eq!(reader.try_read_string("PitLabel"), Some("P12".to_string()));
        });
    }

    #[test]
    fn scalar_read_of_array_yields_first_element() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_f32("TirePressures"), Some(1.0));
        });
    }

    #[test]
    fn unknown_name_is_absent_for_every_type() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_bool("Nope"), None);
            assert_eq!(reader.try_read_i32("Nope"), None);
            assert_eq!(reader.try_read_bitfield("Nope"), None);
            assert_eq!(reader.try_read_f32("Nope"), None);
            assert_eq!(reader.try_read_f64("Nope"), None);
            assert_eq!(reader.try_read_string("Nope"), None);
            assert_eq!(reader.try_read_value("Nope"), None);
        });
    }

    #[test]
    fn type_mismatch_is_absent_not_an_error() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_i32("Speed"), None);
            assert_eq!(reader.try_read_f32("SessionNum"), None);
            assert_eq!(reader.try_read_bool("SessionFlags"), None);
            assert_eq!(reader.try_read_f64("Speed"), None);
            assert_eq!(reader.try_read_string("Speed"), None);
        });
    }

    #[test]
    fn out_of_bounds_range_is_absent() {
        with_reader(&sample_image(), |reader| {
            // Declared length runs past both the buffer and the region.
            assert_eq!(reader.try_read_f32("Overhang"), None);
            assert_eq!(reader.try_read_f32_array("Overhang"), None);
        });
    }

    #[test]
    fn lookup_through_reader_is_case_insensitive() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_f32("speed"), Some(3.0));
            assert_eq!(reader.try_read_f32("SPEED"), Some(3.0));
        });
    }

    #[test]
    fn untyped_read_dispatches_on_catalog_type() {
        with_reader(&sample_image(), |reader| {
            assert_eq!(reader.try_read_value("Speed"), Some(TelemetryValue::Float32(3.0)));
            assert_eq!(
                reader.try_read_value("TirePressures"),
                Some(TelemetryValue::Float32Array(vec![1.0, 2.0, 3.0, 4.0]))
            );
            assert_eq!(
                reader.try_read_value("PitLabel"),
                Some(TelemetryValue::String("P12".to_string()))
            );
        });
    }

    proptest! {
        #[test]
        fn reads_never_panic_on_arbitrary_memory(
            memory in prop::collection::vec(any::<u8>(), 48..2048),
            name in "[a-zA-Z]{1,12}",
            buffer_offset in 0usize..4096,
        ) {
            let Ok(header) = HeaderView::new(&memory) else { return Ok(()) };
            let Ok(catalog) = VariableCatalog::build(&header, &TextDecoder::windows_1252()) else {
                return Ok(());
            };
            let reader = DataReader::new(&memory, &catalog, buffer_offset, TextDecoder::windows_1252());

            let _ = reader.try_read_bool(&name);
            let _ = reader.try_read_i32(&name);
            let _ = reader.try_read_bitfield(&name);
            let _ = reader.try_read_f32(&name);
            let _ = reader.try_read_f64(&name);
            let _ = reader.try_read_string(&name);
            let _ = reader.try_read_value(&name);
            for desc in catalog.iter() {
                let _ = reader.try_read_value(&desc.name);
            }
        }
    }
}
