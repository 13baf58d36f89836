//! Session information extraction and mapping.
//!
//! The simulator keeps a YAML document describing the session — track,
//! weekend options, the driver roster — in a dedicated block of the mapping,
//! located by the header's session-info offset and length. The header's
//! update counter increments each time the block is rewritten, so consumers
//! can cache a parsed [`SessionInfo`] until the counter moves.
//!
//! The raw block is written in the same fixed code page as every other string
//! in the mapping and is NUL-terminated inside its declared length.

use crate::schema::HeaderView;
use crate::text::TextDecoder;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extract the raw session YAML from the mapped region.
///
/// Returns `None` when the header declares no session block or the declared
/// range falls outside the region — the producer may be mid-rewrite, so this
/// is treated like any other absent read.
pub fn extract_session_yaml(header: &HeaderView<'_>, decoder: &TextDecoder) -> Option<String> {
    let len = header.session_info_len();
    let offset = header.session_info_offset();
    if len <= 0 || offset < 0 {
        return None;
    }

    let start = offset as usize;
    let end = start.checked_add(len as usize)?;
    let bytes = header.memory().get(start..end)?;

    let yaml = decoder.decode_fixed(bytes);
    if yaml.trim().is_empty() { None } else { Some(yaml) }
}

/// Parsed session document.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct SessionInfo {
    pub weekend_info: WeekendInfo,
    pub driver_info: DriverInfo,
}

impl SessionInfo {
    /// Parse a session YAML document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let session: SessionInfo = serde_yaml_ng::from_str(yaml)?;
        debug!(
            track = %session.weekend_info.track_name,
            drivers = session.driver_info.drivers.len(),
            "Parsed session info"
        );
        Ok(session)
    }
}

/// Weekend and track information.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct WeekendInfo {
    pub track_name: String,
    #[serde(rename = "TrackID")]
    pub track_id: Option<i32>,
    pub track_display_name: Option<String>,
    pub track_config_name: Option<String>,
    pub track_length: Option<String>,
    pub event_type: Option<String>,
    pub session_type: Option<String>,
    pub official: Option<i32>,
    #[serde(rename = "SeasonID")]
    pub season_id: Option<i32>,
    #[serde(rename = "SessionID")]
    pub session_id: Option<i32>,
    #[serde(rename = "SubSessionID")]
    pub subsession_id: Option<i32>,
}

/// Driver roster and current-driver information.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct DriverInfo {
    pub driver_car_idx: Option<i32>,
    #[serde(rename = "DriverCarIdleRPM")]
    pub driver_car_idle_rpm: Option<f64>,
    pub driver_car_red_line: Option<f64>,
    pub drivers: Vec<Driver>,
}

/// One entry in the driver roster.
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
#[serde(default)]
pub struct Driver {
    pub car_idx: Option<i32>,
    pub user_name: String,
    #[serde(rename = "UserID")]
    pub user_id: Option<i32>,
    pub car_number: Option<String>,
    pub car_screen_name: Option<String>,
    pub i_rating: Option<i32>,
    pub team_name: Option<String>,
}
