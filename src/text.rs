//! Fixed code-page text decoding.
//!
//! The simulator writes every string field — variable names, units,
//! descriptions, and the session YAML block — in Windows-1252. The decoder is
//! an explicit value threaded through catalog construction and string reads
//! rather than process-global encoding state, so nothing in the crate depends
//! on ambient registration.

/// Decoder for the fixed 8-bit code page used by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDecoder {
    kind: Codec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    Windows1252,
}

/// Windows-1252 differs from Latin-1 only in the 0x80..=0x9F range.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

impl TextDecoder {
    /// The code page the simulator actually writes (CP1252).
    pub fn windows_1252() -> Self {
        Self { kind: Codec::Windows1252 }
    }

    /// Decode a fixed-width field, stopping at the first NUL byte or the end
    /// of the field, whichever comes first. A field with no NUL decodes to
    /// its full declared width.
    pub fn decode_fixed(&self, bytes: &[u8]) -> String {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.decode(&bytes[..end])
    }

    /// Decode raw bytes without NUL trimming.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self.kind {
            Codec::Windows1252 => bytes
                .iter()
                .map(|&b| match b {
                    0x00..=0x7F => b as char,
                    0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
                    _ => char::from_u32(b as u32).unwrap_or('\u{FFFD}'),
                })
                .collect(),
        }
    }
}

impl Default for TextDecoder {
    fn default() -> Self {
        Self::windows_1252()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_at_first_nul() {
        let decoder = TextDecoder::windows_1252();
        assert_eq!(decoder.decode_fixed(b"Speed\0\0\0"), "Speed");
        assert_eq!(decoder.decode_fixed(b"RPM\0junk"), "RPM");
        assert_eq!(decoder.decode_fixed(b"\0\0\0\0"), "");
    }

    #[test]
    fn no_nul_decodes_full_width() {
        let decoder = TextDecoder::windows_1252();
        assert_eq!(decoder.decode_fixed(b"LFtempCL"), "LFtempCL");
    }

    #[test]
    fn high_bytes_map_through_cp1252() {
        let decoder = TextDecoder::windows_1252();
        // 0xB0 is the degree sign in CP1252 (Latin-1 range)
        assert_eq!(decoder.decode_fixed(&[0xB0, b'C', 0x00]), "\u{B0}C");
        // 0x99 is the trademark sign, which plain Latin-1 would get wrong
        assert_eq!(decoder.decode_fixed(&[0x99, 0x00]), "\u{2122}");
    }
}
