use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use geo::Coord;
use log::debug;
use serde::{Deserialize, Serialize};

/// A WGS84 position in (lat, lon) order, as the map layer expects it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<Coord> for LatLon {
    fn from(coord: Coord) -> Self {
        LatLon {
            lat: coord.y,
            lon: coord.x,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub started_at: DateTime<FixedOffset>,
    pub finished_at: DateTime<FixedOffset>,
}

impl Entry {
    /// Calendar day the entry started on, in the timestamp's own offset.
    pub fn started_on(&self) -> NaiveDate {
        self.started_at.date_naive()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stay {
    #[serde(flatten)]
    pub entry: Entry,
    pub purpose: String,
    pub position: LatLon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    #[serde(flatten)]
    pub entry: Entry,
    pub mode: String,
    /// Meters
    pub length: i64,
    pub path: Vec<LatLon>,
}

/// One weighted point of the density overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSample {
    pub lat: f64,
    pub lon: f64,
    pub weight: f64,
}

impl HeatSample {
    pub fn new(position: LatLon, weight: f64) -> Self {
        HeatSample {
            lat: position.lat,
            lon: position.lon,
            weight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Stay,
    Movement,
}

impl RowKind {
    /// Only `"Stay"` marks a stay. Every other kind, known (`Track`,
    /// `Movement`) or not, is read as a movement.
    pub fn from_field(value: &str) -> Self {
        match value {
            "Stay" => RowKind::Stay,
            "Track" | "Movement" => RowKind::Movement,
            other => {
                debug!("Unknown row kind {:?}, reading it as a movement", other);
                RowKind::Movement
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RowKind::Stay => "Stay",
            RowKind::Movement => "Movement",
        }
    }
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an export timestamp. Offset-less values keep their wall-clock time
/// and get a zero offset, as do values with a trailing `UTC` or `Z`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }
    if let Some(parsed) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(parsed);
    }
    let wall = value
        .strip_suffix("UTC")
        .or_else(|| value.strip_suffix('Z'))
        .map_or(value, str::trim_end);
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(wall, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}
