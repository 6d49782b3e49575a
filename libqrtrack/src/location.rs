//! The location record that a tracked device reports to the server

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// The address stored when the client doesn't send one
pub const DEFAULT_ADDRESS: &str = "No address information";

/// Shown on the index page before the first update arrives
pub const NOT_RECORDED_MESSAGE: &str = "No location has been recorded yet.";

/// Shown on the index page when the storage backend could not be read
pub const READ_FAILED_MESSAGE: &str = "Failed to read location data.";

/// A latitude or longitude exactly as the client sent it. Phones usually send
/// numbers, but some clients send strings, and both are stored unchanged. An
/// integer stays an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Number(Number),
    Text(String),
}

impl Coordinate {
    /// Interpret the coordinate as a number if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Coordinate::Number(n) => n.as_f64(),
            Coordinate::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Convert an unformatted spreadsheet cell. Numeric cells become numbers and
    /// text cells stay text, even when the text looks like a number.
    pub fn from_cell(cell: Value) -> Self {
        match cell {
            Value::Number(n) => Coordinate::Number(n),
            Value::String(s) => Coordinate::Text(s),
            other => Coordinate::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Number(n) => write!(f, "{n}"),
            Coordinate::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Coordinate {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map_or_else(|| Coordinate::Text(value.to_string()), Coordinate::Number)
    }
}

impl From<i64> for Coordinate {
    fn from(value: i64) -> Self {
        Coordinate::Number(value.into())
    }
}

impl From<&str> for Coordinate {
    fn from(value: &str) -> Self {
        Coordinate::Text(value.to_string())
    }
}

/// A single recorded position of the tracked item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Empty for records written before timestamps were kept
    #[serde(default)]
    pub timestamp: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub address: String,
}

impl Location {
    /// Create a new record stamped with the current time
    pub fn new(lat: Coordinate, lon: Coordinate, address: Option<String>) -> Self {
        Self {
            timestamp: now_timestamp(),
            lat,
            lon,
            address: address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
        }
    }

    /// Both coordinates as numbers, if they can be interpreted that way. The map
    /// widget needs this to position its marker.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat.as_f64()?, self.lon.as_f64()?))
    }
}

/// The current time as an RFC 3339 timestamp, in the local offset when the
/// platform lets us determine it.
pub fn now_timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

/// The payload that a client posts to report its position. `lat` and `lon`
/// must be present and not `null`; their values are otherwise not checked.
/// An explicit `null` is rejected even though the key is present.
#[derive(Debug, Default, Deserialize)]
pub struct LocationUpdate {
    #[serde(default)]
    pub lat: Option<Coordinate>,
    #[serde(default)]
    pub lon: Option<Coordinate>,
    #[serde(default)]
    pub address: Option<String>,
}

impl LocationUpdate {
    pub fn into_location(self) -> Result<Location> {
        let lat = self.lat.ok_or(Error::MissingField("lat"))?;
        let lon = self.lon.ok_or(Error::MissingField("lon"))?;
        Ok(Location::new(lat, lon, self.address))
    }
}

/// What is known about the tracked item's position when rendering a page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LastKnown {
    Recorded(Location),
    Placeholder { message: String },
}

impl LastKnown {
    pub fn not_recorded() -> Self {
        LastKnown::Placeholder {
            message: NOT_RECORDED_MESSAGE.to_string(),
        }
    }

    pub fn read_failed() -> Self {
        LastKnown::Placeholder {
            message: READ_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            LastKnown::Recorded(loc) => Some(loc),
            LastKnown::Placeholder { .. } => None,
        }
    }
}

impl From<Option<Location>> for LastKnown {
    fn from(value: Option<Location>) -> Self {
        value.map_or_else(LastKnown::not_recorded, LastKnown::Recorded)
    }
}
