//! Rust client for iRacing's shared-memory telemetry.
//!
//! Simfeed attaches to the simulator's shared memory mapping, decodes the
//! header and variable table it publishes, and delivers connection and data
//! events to registered handlers. All reads are non-panicking: a missing
//! variable, a type mismatch, or a torn region surfaces as an absent value,
//! never a crash.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use simfeed::{SdkOptions, TelemetryClient, TelemetryEvent};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> simfeed::Result<()> {
//!     let mut client = TelemetryClient::new(SdkOptions::default());
//!
//!     client.on_event(|event| {
//!         if let TelemetryEvent::DataUpdated(reader) = event {
//!             if let Some(speed) = reader.try_read_f32("Speed") {
//!                 println!("speed: {speed} m/s");
//!             }
//!         }
//!     })?;
//!
//!     client.start()?;
//!     tokio::time::sleep(Duration::from_secs(60)).await;
//!     client.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Platform
//!
//! Live telemetry requires Windows, where the simulator runs. The decoding
//! layers ([`HeaderView`], [`VariableCatalog`], [`DataReader`],
//! [`SessionInfo`]) work over any byte slice on any platform.

pub mod broadcast;
mod error;
mod options;
mod pump;
mod reader;
pub mod schema;
pub mod session;
mod supervisor;
mod text;
pub mod types;

#[cfg(windows)]
pub(crate) mod windows;

#[cfg(test)]
mod test_image;

pub use broadcast::{BroadcastCommand, BROADCAST_MESSAGE_NAME};
pub use error::{Result, SdkError};
pub use options::{SdkOptions, DATA_VALID_EVENT_NAME, MEM_MAP_FILE_NAME};
pub use pump::TelemetryEvent;
pub use reader::DataReader;
pub use schema::{HeaderView, VariableCatalog, VariableDescriptor};
pub use session::{extract_session_yaml, SessionInfo};
pub use supervisor::TelemetryClient;
pub use text::TextDecoder;
pub use types::{BitField, TelemetryValue, VariableType};

#[cfg(windows)]
pub use broadcast::BroadcastEmitter;
