// Feed models and data fetching for the WayPoint Tracker
//
// Feed Endpoint:
// - Route JSON: https://firebasestorage.googleapis.com/v0/b/santa-tracker-firebase.appspot.com/o/route%2Fsanta_en.json
//
// The feed is a JSON object with a `destinations` array. Each destination carries
// an id, arrival/departure timestamps (epoch milliseconds), a location and
// display strings. Extra fields in the feed are ignored.

use reqwest::blocking;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Timestamp exactly as it appears in the feed.
///
/// Anything that is not a number or a string lands in `Other` and is treated
/// as an invalid date downstream, so a bad timestamp never rejects the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for RawTimestamp {
    fn default() -> Self {
        RawTimestamp::Other(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub arrival: RawTimestamp,
    #[serde(default)]
    pub departure: RawTimestamp,
    pub location: Location,
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub region: String,
}

// Display strings: null is empty, numbers and bools keep their JSON text
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub destinations: Option<Vec<Waypoint>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaypointStatus {
    Upcoming,
    Active,
    Visited,
}

impl WaypointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaypointStatus::Upcoming => "upcoming",
            WaypointStatus::Active => "active",
            WaypointStatus::Visited => "visited",
        }
    }
}

impl std::fmt::Display for WaypointStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Waypoint re-dated to the reference year, with its derived status.
///
/// `arrival` and `departure` are epoch milliseconds; `None` stands for a
/// timestamp that could not be understood.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedWaypoint {
    pub id: String,
    pub arrival: Option<i64>,
    pub departure: Option<i64>,
    pub location: Location,
    pub city: String,
    pub region: String,
    pub status: WaypointStatus,
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug, Error)]
pub enum WPTError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("File error: {0}")]
    FileError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, WPTError>;

// ============================================================================
// Main Implementation
// ============================================================================

pub struct WPTModels;

impl WPTModels {
    pub const DEFAULT_FEED_URL: &'static str = "https://firebasestorage.googleapis.com/v0/b/santa-tracker-firebase.appspot.com/o/route%2Fsanta_en.json?alt=media&2018b";
    pub const REQUEST_TIMEOUT_SECS: u64 = 15;

    /// Fetch the feed over HTTP. One GET, no retries.
    pub fn fetch_feed(url: &str, timeout_secs: u64) -> Result<Feed> {
        log::info!("Fetching waypoint feed from {}", url);

        let client = blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| WPTError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        let response = client.get(url)
            .send()
            .map_err(|e| WPTError::NetworkError(format!("Failed to fetch feed: {}. Check your internet connection.", e)))?;

        if !response.status().is_success() {
            return Err(WPTError::NetworkError(format!("Feed returned error: {}", response.status())));
        }

        let body = response.text()
            .map_err(|e| WPTError::NetworkError(format!("Failed to read response: {}", e)))?;

        Self::parse_feed(&body)
    }

    /// Read the feed from a JSON file on disk.
    pub fn load_feed_file(path: &Path) -> Result<Feed> {
        log::info!("Loading waypoint feed from {:?}", path);

        let body = fs::read_to_string(path)
            .map_err(|e| WPTError::FileError(format!("Failed to read {:?}: {}", path, e)))?;

        Self::parse_feed(&body)
    }

    /// Decode a feed body. A `null` body is an empty feed.
    pub fn parse_feed(body: &str) -> Result<Feed> {
        let feed = serde_json::from_str::<Option<Feed>>(body)
            .map_err(|e| WPTError::ParseError(format!("Invalid JSON response: {}", e)))?
            .unwrap_or_default();

        match &feed.destinations {
            Some(destinations) => log::debug!("Feed holds {} destinations", destinations.len()),
            None => log::warn!("Feed has no destinations"),
        }

        Ok(feed)
    }
}
