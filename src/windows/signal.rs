//! Data-valid event plumbing.
//!
//! The producer pulses a named auto-reset event each time it publishes a
//! telemetry frame. The pump blocks on that event with no timeout; a private
//! manual-reset stop event is waited alongside it so shutdown can force the
//! wait awake instead of waiting for another frame that may never come.

use crate::windows::region::wide_string;
use crate::{Result, SdkError};
use tracing::trace;
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_EVENT, WAIT_OBJECT_0};
use windows::Win32::System::Threading::{
    CreateEventW, INFINITE, OpenEventW, SYNCHRONIZATION_ACCESS_RIGHTS, SetEvent,
    WaitForMultipleObjects,
};
use windows::core::PCWSTR;

/// Which event ended a [`DataSignal::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignalWait {
    /// The producer published a frame.
    Data,
    /// The stop event was set; the caller should re-check cancellation.
    Stop,
}

/// The producer's data-valid event paired with a private stop event.
pub(crate) struct DataSignal {
    data: HANDLE,
    stop: HANDLE,
}

impl DataSignal {
    /// Open the named data-valid event and create the stop event.
    ///
    /// A missing named event means the simulator is not running, which is a
    /// retryable discovery failure.
    pub(crate) fn open(name: &str) -> Result<Self> {
        let data = unsafe {
            let wide_name = wide_string(name);
            OpenEventW(
                SYNCHRONIZATION_ACCESS_RIGHTS(0x0010_0000), // SYNCHRONIZE
                false,
                PCWSTR::from_raw(wide_name.as_ptr()),
            )
            .map_err(|e| {
                SdkError::discovery_with_source(
                    format!("data-valid event '{name}' is not available"),
                    Box::new(e),
                )
            })?
        };

        // Manual reset and initially unset: once stopped, every subsequent
        // wait returns immediately.
        let stop = unsafe {
            match CreateEventW(None, true, false, PCWSTR::null()) {
                Ok(stop) => stop,
                Err(e) => {
                    let _ = CloseHandle(data);
                    return Err(SdkError::windows_api("CreateEventW", e));
                }
            }
        };

        trace!(name, "Opened data-valid event");
        Ok(Self { data, stop })
    }

    /// Block until the producer signals or the stop event is set.
    pub(crate) fn wait(&self) -> Result<SignalWait> {
        let result = unsafe { WaitForMultipleObjects(&[self.data, self.stop], false, INFINITE) };

        if result == WAIT_OBJECT_0 {
            Ok(SignalWait::Data)
        } else if result == WAIT_EVENT(WAIT_OBJECT_0.0 + 1) {
            Ok(SignalWait::Stop)
        } else {
            let win_err = windows::core::Error::from_thread();
            Err(SdkError::windows_api("WaitForMultipleObjects", win_err))
        }
    }

    /// Set the stop event, waking any in-flight [`wait`](Self::wait).
    pub(crate) fn wake(&self) {
        unsafe {
            let _ = SetEvent(self.stop);
        }
    }
}

impl Drop for DataSignal {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.data);
            let _ = CloseHandle(self.stop);
        }
        trace!("Released data-valid event");
    }
}

// SAFETY: both handles are kernel event objects, valid from any thread.
unsafe impl Send for DataSignal {}
unsafe impl Sync for DataSignal {}
