//! Builders for synthetic shared-memory images used across unit tests.

#![cfg(test)]

use crate::schema::header::{BUFFER_ENTRY_LEN, HEADER_FIXED_LEN};
use crate::schema::catalog::VAR_DESCRIPTOR_LEN;

/// Fixed-header image with an explicit buffer descriptor table.
#[derive(Debug, Clone)]
pub struct HeaderImage {
    pub version: i32,
    pub status: i32,
    pub tick_rate: i32,
    pub session_info_update: i32,
    pub session_info_len: i32,
    pub session_info_offset: i32,
    pub var_count: i32,
    pub var_table_offset: i32,
    pub buffer_len: i32,
    /// (tick count, buffer offset) pairs; buffer count is derived.
    pub buffers: Vec<(i32, i32)>,
}

impl HeaderImage {
    /// A header that passes validation, with a single empty buffer.
    pub fn valid() -> Self {
        Self {
            version: 2,
            status: 1,
            tick_rate: 60,
            session_info_update: 0,
            session_info_len: 0,
            session_info_offset: 0,
            var_count: 0,
            var_table_offset: HEADER_FIXED_LEN as i32,
            buffer_len: 0,
            buffers: vec![(0, 0)],
        }
    }

    /// Serialize to little-endian header bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_FIXED_LEN + self.buffers.len() * BUFFER_ENTRY_LEN];
        put_i32(&mut out, 0, self.version);
        put_i32(&mut out, 4, self.status);
        put_i32(&mut out, 8, self.tick_rate);
        put_i32(&mut out, 12, self.session_info_update);
        put_i32(&mut out, 16, self.session_info_len);
        put_i32(&mut out, 20, self.session_info_offset);
        put_i32(&mut out, 24, self.var_count);
        put_i32(&mut out, 28, self.var_table_offset);
        put_i32(&mut out, 32, self.buffers.len() as i32);
        put_i32(&mut out, 36, self.buffer_len);
        for (i, &(tick, offset)) in self.buffers.iter().enumerate() {
            let base = HEADER_FIXED_LEN + i * BUFFER_ENTRY_LEN;
            put_i32(&mut out, base, tick);
            put_i32(&mut out, base + 4, offset);
        }
        out
    }
}

/// One 144-byte variable descriptor.
#[derive(Debug, Clone)]
pub struct VarImage {
    pub raw_type: i32,
    pub offset: i32,
    pub count: i32,
    pub name: String,
    pub description: String,
    pub unit: String,
}

impl VarImage {
    pub fn new(raw_type: i32, offset: i32, count: i32, name: &str) -> Self {
        Self {
            raw_type,
            offset,
            count,
            name: name.to_string(),
            description: format!("{name} description"),
            unit: String::new(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; VAR_DESCRIPTOR_LEN];
        put_i32(&mut out, 0, self.raw_type);
        put_i32(&mut out, 4, self.offset);
        put_i32(&mut out, 8, self.count);
        put_str(&mut out, 16, 32, &self.name);
        put_str(&mut out, 48, 64, &self.description);
        put_str(&mut out, 112, 32, &self.unit);
        out
    }
}

/// Full region image: header, variable table, and one data buffer.
///
/// Layout: header at 0, variable table immediately after the buffer
/// descriptors, the single data buffer after the table. The buffer's tick
/// count is 1 so it is always the active buffer.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    pub vars: Vec<VarImage>,
    pub buffer: Vec<u8>,
    pub status: i32,
    pub session_info: Option<Vec<u8>>,
}

impl MemoryImage {
    pub fn new(vars: Vec<VarImage>, buffer: Vec<u8>) -> Self {
        Self { vars, buffer, status: 1, session_info: None }
    }

    pub fn build(&self) -> Vec<u8> {
        let var_table_offset = HEADER_FIXED_LEN + BUFFER_ENTRY_LEN;
        let buffer_offset = var_table_offset + self.vars.len() * VAR_DESCRIPTOR_LEN;
        let session_offset = buffer_offset + self.buffer.len();

        let header = HeaderImage {
            status: self.status,
            session_info_len: self.session_info.as_ref().map_or(0, |s| s.len() as i32),
            session_info_offset: if self.session_info.is_some() { session_offset as i32 } else { 0 },
            var_count: self.vars.len() as i32,
            var_table_offset: var_table_offset as i32,
            buffer_len: self.buffer.len() as i32,
            buffers: vec![(1, buffer_offset as i32)],
            ..HeaderImage::valid()
        };

        let mut out = header.build();
        debug_assert_eq!(out.len(), var_table_offset);
        for var in &self.vars {
            out.extend_from_slice(&var.build());
        }
        out.extend_from_slice(&self.buffer);
        if let Some(session) = &self.session_info {
            out.extend_from_slice(session);
        }
        out
    }
}

fn put_i32(out: &mut [u8], offset: usize, value: i32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn put_str(out: &mut [u8], offset: usize, width: usize, value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width);
    out[offset..offset + len].copy_from_slice(&bytes[..len]);
}
