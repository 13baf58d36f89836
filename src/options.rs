//! Client configuration.

use crate::text::TextDecoder;
use std::time::Duration;

/// iRacing shared memory file name.
pub const MEM_MAP_FILE_NAME: &str = "Local\\IRSDKMemMapFileName";
/// iRacing data valid event name.
pub const DATA_VALID_EVENT_NAME: &str = "Local\\IRSDKDataValidEvent";

/// Options for [`TelemetryClient`](crate::TelemetryClient).
///
/// The defaults match the live simulator; the names are overridable so tests
/// and replay harnesses can stand in their own producer.
#[derive(Debug, Clone)]
pub struct SdkOptions {
    /// Delay between discovery attempts while the simulator is not running.
    ///
    /// The producer's absence is an expected, long-lived condition, so the
    /// retry is a fixed delay rather than a backoff.
    pub retry_delay: Duration,
    /// Name of the shared-memory mapping to open.
    pub mem_map_name: String,
    /// Name of the auto-reset event the simulator signals after each write.
    pub data_event_name: String,
    /// Decoder for the fixed code page the simulator writes strings in.
    pub decoder: TextDecoder,
}

impl Default for SdkOptions {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            mem_map_name: MEM_MAP_FILE_NAME.to_string(),
            data_event_name: DATA_VALID_EVENT_NAME.to_string(),
            decoder: TextDecoder::windows_1252(),
        }
    }
}

impl SdkOptions {
    /// Options with a custom discovery retry delay.
    pub fn with_retry_delay(retry_delay: Duration) -> Self {
        Self { retry_delay, ..Self::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulator_names() {
        let options = SdkOptions::default();
        assert_eq!(options.mem_map_name, "Local\\IRSDKMemMapFileName");
        assert_eq!(options.data_event_name, "Local\\IRSDKDataValidEvent");
        assert_eq!(options.retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn retry_delay_override() {
        let options = SdkOptions::with_retry_delay(Duration::from_millis(250));
        assert_eq!(options.retry_delay, Duration::from_millis(250));
        assert_eq!(options.mem_map_name, MEM_MAP_FILE_NAME);
    }
}
