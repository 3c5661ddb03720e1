use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Date format used for scene identifiers and baseline tables
pub const SCENE_DATE_FORMAT: &str = "%Y%m%d";

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// One acquisition in a baseline network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Identifier as written in the baseline table (e.g. `20160501`)
    pub label: String,
    /// Calendar day of the acquisition
    pub date: NaiveDate,
    /// Perpendicular baseline relative to the reference scene (meters)
    pub perpendicular_baseline: f64,
    /// Parallel baseline relative to the reference scene (meters)
    pub parallel_baseline: f64,
    /// Backing SLC product (e.g. `IW1_20160501.SLC`)
    pub product: PathBuf,
}

impl Scene {
    /// Product name without directory or extension, as GMTSAR names the scene
    pub fn product_stem(&self) -> String {
        self.product
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.label.clone())
    }
}

/// Interferogram pair as indices into a scene list, lower index first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair(pub usize, pub usize);

impl Pair {
    /// Build a pair with the lower index first
    pub fn canonical(a: usize, b: usize) -> Self {
        if a <= b {
            Pair(a, b)
        } else {
            Pair(b, a)
        }
    }
}

/// Orbit pass direction from the annotation product information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassDirection {
    Ascending,
    Descending,
}

impl std::fmt::Display for PassDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassDirection::Ascending => write!(f, "Ascending"),
            PassDirection::Descending => write!(f, "Descending"),
        }
    }
}

/// Metadata of one TOPS sub-swath, taken from its annotation XML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubswathMetadata {
    // Product identification
    pub mission_id: String,
    pub product_type: String,
    pub polarisation: String,
    pub mode: String,
    pub swath: String,
    pub absolute_orbit_number: u32,

    // Acquisition window
    pub start_time: NaiveDateTime,
    pub stop_time: NaiveDateTime,

    // Radar parameters
    pub pass_direction: PassDirection,
    pub radar_frequency: f64,      // Hz
    pub range_sampling_rate: f64,  // Hz
    pub range_pixel_size: f64,     // meters
    pub azimuth_pixel_size: f64,   // meters
    pub azimuth_time_interval: f64, // seconds
    pub starting_range: f64,       // meters
    pub incidence_angle: f64,      // degrees
    pub prf: f64,                  // Hz
    pub terrain_height: f64,       // meters

    // Burst dimensions
    pub lines_per_burst: usize,
    pub samples_per_burst: usize,
}

impl SubswathMetadata {
    /// Prefix GMTSAR uses for the products of this scene (e.g. `IW1_20160501`)
    pub fn product_prefix(&self) -> String {
        format!("{}_{}", self.swath, self.start_time.format(SCENE_DATE_FORMAT))
    }
}

/// Error types for stack processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Missing key '{key}' in {origin}")]
    MissingKey { key: String, origin: String },

    #[error("External tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for stack operations
pub type SarResult<T> = Result<T, SarError>;

/// Parse a scene date; only the leading `YYYYMMDD` is significant so that
/// identifiers carrying path/orbit qualifiers still resolve to a day
pub fn parse_scene_date(token: &str) -> SarResult<NaiveDate> {
    let day = token.get(..8).unwrap_or(token);
    NaiveDate::parse_from_str(day, SCENE_DATE_FORMAT)
        .map_err(|e| SarError::InvalidFormat(format!("Invalid scene date '{}': {}", token, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_date_with_qualifier() {
        let date = parse_scene_date("20160501_P123").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2016, 5, 1).unwrap());
        assert!(parse_scene_date("2016-05-01").is_err());
    }

    #[test]
    fn test_pair_canonical() {
        assert_eq!(Pair::canonical(4, 1), Pair(1, 4));
        assert_eq!(Pair::canonical(1, 4), Pair(1, 4));
    }
}
