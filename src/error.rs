//! Error types for the telemetry client.
//!
//! The crate distinguishes four failure classes:
//!
//! - **Discovery** — the simulator's mapping or data-valid event is not
//!   present. Expected whenever iRacing is not running; the supervisor retries
//!   these on a fixed delay and never surfaces them as hard failures.
//! - **Version** — the shared-memory header reports an unsupported protocol
//!   version. Fatal to that mapping; no partial decode is attempted.
//! - **Lifecycle** — an operation was invoked after the client was stopped.
//!   Fatal to that call only.
//! - **Parse / Session / WindowsApi** — malformed producer data, session YAML
//!   failures, and raw OS errors.
//!
//! Out-of-bounds or mismatched typed reads are *not* errors: the accessor
//! layer downgrades them to `None` because the producer may be mid-rewrite.

use thiserror::Error;

#[cfg(windows)]
use windows_core as core;

/// Result type alias for telemetry operations.
pub type Result<T, E = SdkError> = std::result::Result<T, E>;

/// Main error type for telemetry operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SdkError {
    #[error("Simulator not discovered: {reason}")]
    Discovery {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Protocol version mismatch: expected {expected}, found {found}")]
    Version { expected: i32, found: i32 },

    #[error("Malformed shared memory in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Client already stopped: {operation}")]
    Lifecycle { operation: String },

    #[error("Session info error: {reason}")]
    Session {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("{feature} is only available on {required_platform}")]
    UnsupportedPlatform { feature: String, required_platform: String },

    #[cfg(windows)]
    #[error("Windows API error: {operation}")]
    WindowsApi {
        operation: String,
        #[source]
        source: core::Error,
    },
}

impl SdkError {
    /// Returns whether this error is expected to clear on its own and is
    /// worth retrying on the discovery delay.
    pub fn is_retryable(&self) -> bool {
        match self {
            SdkError::Discovery { .. } => true,
            SdkError::Version { .. } => false,
            SdkError::Parse { .. } => false,
            SdkError::Lifecycle { .. } => false,
            SdkError::Session { .. } => false,
            SdkError::UnsupportedPlatform { .. } => false,
            #[cfg(windows)]
            SdkError::WindowsApi { .. } => false,
        }
    }

    /// Helper constructor for discovery failures (simulator not running).
    pub fn discovery(reason: impl Into<String>) -> Self {
        SdkError::Discovery { reason: reason.into(), source: None }
    }

    /// Helper constructor for discovery failures with an underlying cause.
    pub fn discovery_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        SdkError::Discovery { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for malformed producer data.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        SdkError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for use-after-stop violations.
    pub fn lifecycle(operation: impl Into<String>) -> Self {
        SdkError::Lifecycle { operation: operation.into() }
    }

    /// Helper constructor for session info failures.
    pub fn session(reason: impl Into<String>) -> Self {
        SdkError::Session { reason: reason.into(), source: None }
    }

    /// Helper constructor for Windows API errors.
    #[cfg(windows)]
    pub fn windows_api(operation: impl Into<String>, source: core::Error) -> Self {
        SdkError::WindowsApi { operation: operation.into(), source }
    }

    /// Helper constructor for platform gating.
    pub fn unsupported_platform(
        feature: impl Into<String>,
        required_platform: impl Into<String>,
    ) -> Self {
        SdkError::UnsupportedPlatform {
            feature: feature.into(),
            required_platform: required_platform.into(),
        }
    }
}

impl From<serde_yaml_ng::Error> for SdkError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SdkError::Session {
            reason: "Failed to deserialize session YAML".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
