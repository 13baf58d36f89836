//! Shared-memory control header decoding.
//!
//! The first bytes of the mapping are a fixed-offset control header (all
//! fields little-endian 32-bit integers):
//!
//! | Offset | Field                        |
//! |--------|------------------------------|
//! | 0      | Version                      |
//! | 4      | Status (bit 0 = connected)   |
//! | 8      | Tick rate (Hz)               |
//! | 12     | Session-info update counter  |
//! | 16     | Session-info length          |
//! | 20     | Session-info offset          |
//! | 24     | Variable count               |
//! | 28     | Variable-table offset        |
//! | 32     | Buffer count                 |
//! | 36     | Buffer length                |
//! | 48+i*16| Buffer i: tick count, offset |
//!
//! [`HeaderView`] is a pure, stateless decode: every getter re-reads the
//! mapping at call time, so the view always reflects the live header while
//! the producer rewrites it. Nothing here trusts the producer — every access
//! beyond the fixed 48-byte prefix is a checked slice read.

use crate::{Result, SdkError};
use tracing::trace;

/// The protocol version this crate understands.
pub const SUPPORTED_VERSION: i32 = 2;

/// Status bit indicating the simulator is actively publishing telemetry.
pub const STATUS_CONNECTED: i32 = 0x1;

/// Byte length of the fixed header prefix, up to the buffer descriptor table.
pub const HEADER_FIXED_LEN: usize = 48;

/// Stride of one (tick count, offset, padding) buffer descriptor.
pub const BUFFER_ENTRY_LEN: usize = 16;

mod offsets {
    pub const VERSION: usize = 0;
    pub const STATUS: usize = 4;
    pub const TICK_RATE: usize = 8;
    pub const SESSION_INFO_UPDATE: usize = 12;
    pub const SESSION_INFO_LEN: usize = 16;
    pub const SESSION_INFO_OFFSET: usize = 20;
    pub const VAR_COUNT: usize = 24;
    pub const VAR_TABLE_OFFSET: usize = 28;
    pub const BUFFER_COUNT: usize = 32;
    pub const BUFFER_LEN: usize = 36;
    pub const BUFFER_TABLE: usize = 48;
}

/// Live view over the control header of a mapped region.
#[derive(Debug, Clone, Copy)]
pub struct HeaderView<'a> {
    memory: &'a [u8],
}

impl<'a> HeaderView<'a> {
    /// Wrap a mapped region. Fails if the region cannot hold even the fixed
    /// header prefix.
    pub fn new(memory: &'a [u8]) -> Result<Self> {
        if memory.len() < HEADER_FIXED_LEN {
            return Err(SdkError::parse(
                "header",
                format!("region of {} bytes is smaller than the {HEADER_FIXED_LEN}-byte header", memory.len()),
            ));
        }
        Ok(Self { memory })
    }

    /// Reject any mapping whose declared layout cannot be decoded.
    ///
    /// An unsupported version is a hard fault for the whole mapping; no
    /// best-effort parse across protocol versions is attempted.
    pub fn validate(&self) -> Result<()> {
        let version = self.version();
        if version != SUPPORTED_VERSION {
            return Err(SdkError::Version { expected: SUPPORTED_VERSION, found: version });
        }

        if self.buffer_count() < 1 {
            return Err(SdkError::parse(
                "header",
                format!("buffer count must be at least 1, found {}", self.buffer_count()),
            ));
        }

        if self.buffer_len() < 0 || self.var_count() < 0 || self.var_table_offset() < 0 {
            return Err(SdkError::parse("header", "negative length or offset field".to_string()));
        }

        Ok(())
    }

    /// Protocol version written by the producer.
    pub fn version(&self) -> i32 {
        self.read_i32(offsets::VERSION)
    }

    /// Raw status bitmask.
    pub fn status(&self) -> i32 {
        self.read_i32(offsets::STATUS)
    }

    /// Whether the producer reports itself actively running (status bit 0).
    pub fn is_connected(&self) -> bool {
        self.status() & STATUS_CONNECTED != 0
    }

    /// Telemetry update rate in Hz (usually 60).
    pub fn tick_rate(&self) -> i32 {
        self.read_i32(offsets::TICK_RATE)
    }

    /// Counter incremented each time the session info block is rewritten.
    pub fn session_info_update(&self) -> i32 {
        self.read_i32(offsets::SESSION_INFO_UPDATE)
    }

    /// Byte length of the session info block.
    pub fn session_info_len(&self) -> i32 {
        self.read_i32(offsets::SESSION_INFO_LEN)
    }

    /// Byte offset of the session info block from the start of the mapping.
    pub fn session_info_offset(&self) -> i32 {
        self.read_i32(offsets::SESSION_INFO_OFFSET)
    }

    /// Number of entries in the variable descriptor table.
    pub fn var_count(&self) -> i32 {
        self.read_i32(offsets::VAR_COUNT)
    }

    /// Byte offset of the variable descriptor table.
    pub fn var_table_offset(&self) -> i32 {
        self.read_i32(offsets::VAR_TABLE_OFFSET)
    }

    /// Number of telemetry buffers the producer rotates through.
    pub fn buffer_count(&self) -> i32 {
        self.read_i32(offsets::BUFFER_COUNT)
    }

    /// Byte length of one telemetry buffer.
    pub fn buffer_len(&self) -> i32 {
        self.read_i32(offsets::BUFFER_LEN)
    }

    /// Offset of the most recently completed write.
    ///
    /// The producer writes buffers round-robin and bumps each buffer's tick
    /// count after writing, so the highest tick count identifies the freshest
    /// buffer without a lock. Ties resolve to the lowest index (first-seen
    /// max wins). This is a best-effort, non-linearizable read: a write in
    /// progress is not excluded.
    pub fn active_buffer_offset(&self) -> usize {
        let mut max_tick = i32::MIN;
        let mut offset = 0usize;

        for i in 0..self.buffer_count().max(0) as usize {
            let base = offsets::BUFFER_TABLE + i * BUFFER_ENTRY_LEN;
            let (Some(tick), Some(buf_offset)) =
                (self.try_read_i32(base), self.try_read_i32(base + 4))
            else {
                // Descriptor past the end of the region; the producer lied
                // about its buffer count. Use whatever was readable.
                break;
            };

            if tick > max_tick {
                max_tick = tick;
                offset = buf_offset.max(0) as usize;
            }
        }

        trace!(max_tick, offset, "Resolved active buffer");
        offset
    }

    /// The region this view decodes.
    pub fn memory(&self) -> &'a [u8] {
        self.memory
    }

    fn read_i32(&self, offset: usize) -> i32 {
        // new() guarantees the fixed 48-byte prefix is present.
        let bytes = &self.memory[offset..offset + 4];
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    fn try_read_i32(&self, offset: usize) -> Option<i32> {
        let bytes = self.memory.get(offset..offset + 4)?;
        Some(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
