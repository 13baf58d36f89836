//! Read-only view over the simulator's shared memory mapping.

use crate::{Result, SdkError};
use std::ptr::NonNull;
use tracing::{debug, trace};
use windows::Win32::Foundation::CloseHandle;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Memory::{
    FILE_MAP_READ, MEMORY_BASIC_INFORMATION, MEMORY_MAPPED_VIEW_ADDRESS, MapViewOfFile,
    OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
};
use windows::core::PCWSTR;

/// A mapped read-only view of the producer's shared memory section.
///
/// The view stays valid for the lifetime of this struct; releasing it unmaps
/// the view before closing the section handle.
pub(crate) struct SharedMemoryRegion {
    mapping: HANDLE,
    base: NonNull<u8>,
    len: usize,
}

impl SharedMemoryRegion {
    /// Open the named section and map it read-only.
    ///
    /// A missing section means the simulator is not running; that surfaces as
    /// a retryable discovery error. Failures after the section exists are
    /// API errors.
    pub(crate) fn open(name: &str) -> Result<Self> {
        trace!(name, "Opening shared memory section");

        let mapping = unsafe {
            let wide_name = wide_string(name);
            OpenFileMappingW(FILE_MAP_READ.0, false, PCWSTR::from_raw(wide_name.as_ptr()))
                .map_err(|e| {
                    SdkError::discovery_with_source(
                        format!("shared memory section '{name}' is not available"),
                        Box::new(e),
                    )
                })?
        };

        let base = unsafe {
            let ptr = MapViewOfFile(mapping, FILE_MAP_READ, 0, 0, 0);
            match NonNull::new(ptr.Value as *mut u8) {
                Some(base) => base,
                None => {
                    let win_err = windows::core::Error::from_thread();
                    let _ = CloseHandle(mapping);
                    return Err(SdkError::windows_api("MapViewOfFile", win_err));
                }
            }
        };

        // Mapping the full section with length 0 leaves the actual size
        // unknown; ask the allocator for the committed region size.
        let len = unsafe {
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let written = VirtualQuery(
                Some(base.as_ptr() as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            );
            if written == 0 {
                let win_err = windows::core::Error::from_thread();
                let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: base.as_ptr() as *mut _ };
                let _ = UnmapViewOfFile(addr);
                let _ = CloseHandle(mapping);
                return Err(SdkError::windows_api("VirtualQuery", win_err));
            }
            info.RegionSize
        };

        debug!(name, len, "Mapped shared memory section");
        Ok(Self { mapping, base, len })
    }

    /// The mapped bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        // SAFETY: base points at a live mapped view of `len` bytes, held
        // until Drop.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }
}

impl Drop for SharedMemoryRegion {
    fn drop(&mut self) {
        unsafe {
            let addr = MEMORY_MAPPED_VIEW_ADDRESS { Value: self.base.as_ptr() as *mut _ };
            let _ = UnmapViewOfFile(addr);
            let _ = CloseHandle(self.mapping);
        }
        trace!("Released shared memory section");
    }
}

// SAFETY: the region is a read-only view backed by kernel objects that are
// valid from any thread.
unsafe impl Send for SharedMemoryRegion {}
unsafe impl Sync for SharedMemoryRegion {}

/// Convert string to null-terminated wide string for Windows APIs.
pub(crate) fn wide_string(s: &str) -> Vec<u16> {
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    OsStr::new(s).encode_wide().chain(std::iter::once(0)).collect()
}
