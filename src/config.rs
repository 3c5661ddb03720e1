//! Run parameters.
//!
//! Every pipeline takes its tunables from one of these structs. They can be
//! read from a TOML parameter file, and the command line overrides whatever
//! the file sets:
//!
//! ```toml
//! [select]
//! bcrit = 150.0
//! month_min = 5
//! month_max = 10
//! event = "2016-08-24"
//!
//! [orbits]
//! precise_age_days = 21
//! ```

use crate::types::{SarError, SarResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

/// Orbit archive holding `aux_poeorb/` and `aux_resorb/` listings
pub const DEFAULT_ORBIT_INDEX_URL: &str = "https://www.unavco.org/data/imaging/sar/lts1/winsar/s1qc";

/// Which candidate set becomes the selected network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    /// Every pair passing the baseline thresholds
    All,
    /// Delaunay edges passing the thresholds plus short-gap pairs
    #[default]
    Delaunay,
}

impl FromStr for SelectionMethod {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SelectionMethod::All),
            "del" | "delaunay" => Ok(SelectionMethod::Delaunay),
            other => Err(SarError::Config(format!(
                "Unknown selection method '{}' (expected all or delaunay)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionMethod::All => write!(f, "all"),
            SelectionMethod::Delaunay => write!(f, "delaunay"),
        }
    }
}

/// Where short temporal-gap pairs are drawn from when they are added back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShortGapSource {
    /// All date combinations, before the baseline thresholds
    #[default]
    Exhaustive,
    /// Only combinations that already pass the baseline thresholds
    Filtered,
}

/// Pair selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    /// Critical perpendicular baseline (m)
    pub bcrit: f64,
    /// Critical temporal baseline (days)
    pub tcrit: i64,
    /// Pairs at most this many days apart are always added (days)
    pub dmax: i64,
    /// First month of year to keep (1-12)
    pub month_min: u32,
    /// Last month of year to keep (1-12), not wrapping past December
    pub month_max: u32,
    pub method: SelectionMethod,
    /// Keep only pairs straddling this date
    pub event: Option<NaiveDate>,
    pub short_gap_source: ShortGapSource,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            bcrit: 200.0,
            tcrit: 9999,
            dmax: 48,
            month_min: 1,
            month_max: 12,
            method: SelectionMethod::Delaunay,
            event: None,
            short_gap_source: ShortGapSource::Exhaustive,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> SarResult<()> {
        for (name, month) in [("month_min", self.month_min), ("month_max", self.month_max)] {
            if !(1..=12).contains(&month) {
                return Err(SarError::Config(format!("{} must be within 1-12, got {}", name, month)));
            }
        }
        if self.month_min > self.month_max {
            return Err(SarError::Config(format!(
                "month range {}-{} is empty; ranges do not wrap past December",
                self.month_min, self.month_max
            )));
        }
        if self.bcrit.is_nan() || self.bcrit < 0.0 {
            return Err(SarError::Config(format!("bcrit must be non-negative, got {}", self.bcrit)));
        }
        Ok(())
    }
}

/// Parse an event date given as `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_event_date(text: &str) -> SarResult<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y%m%d"))
        .map_err(|e| SarError::Config(format!("Invalid event date '{}': {}", text, e)))
}

/// Static parameters for the per-pair interferogram script (`config.tops.txt`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopsProcessingConfig {
    pub proc_stage: u32,
    pub topo_phase: u32,
    pub topo_shift: u32,
    pub switch_master: u32,
    pub filter_wavelength: u32,
    pub dec_factor: u32,
    pub threshold_snaphu: f64,
    pub switch_land: u32,
    pub defomax: f64,
    pub threshold_geocode: f64,
}

impl Default for TopsProcessingConfig {
    fn default() -> Self {
        Self {
            proc_stage: 4,
            topo_phase: 1,
            topo_shift: 1,
            switch_master: 0,
            filter_wavelength: 200,
            dec_factor: 2,
            threshold_snaphu: 0.1,
            switch_land: 1,
            defomax: 0.0,
            threshold_geocode: 0.10,
        }
    }
}

impl TopsProcessingConfig {
    /// Render as `key = value` lines
    pub fn to_config_text(&self) -> String {
        let mut text = String::new();
        let entries: [(&str, String); 10] = [
            ("proc_stage", self.proc_stage.to_string()),
            ("topo_phase", self.topo_phase.to_string()),
            ("topo_shift", self.topo_shift.to_string()),
            ("switch_master", self.switch_master.to_string()),
            ("filter_wavelength", self.filter_wavelength.to_string()),
            ("dec_factor", self.dec_factor.to_string()),
            ("threshold_snaphu", self.threshold_snaphu.to_string()),
            ("switch_land", self.switch_land.to_string()),
            ("defomax", self.defomax.to_string()),
            ("threshold_geocode", self.threshold_geocode.to_string()),
        ];
        for (key, value) in entries {
            // Writing to a String cannot fail
            let _ = writeln!(text, "{} = {}", key, value);
        }
        text
    }
}

/// Orbit archive access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrbitConfig {
    pub base_url: String,
    /// Scenes older than this use precise orbits (days)
    pub precise_age_days: i64,
    /// HTTP timeout (s)
    pub timeout_secs: u64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORBIT_INDEX_URL.to_string(),
            precise_age_days: 20,
            timeout_secs: 30,
        }
    }
}

/// Contents of a `--config` parameter file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    pub select: SelectionConfig,
    pub tops: TopsProcessingConfig,
    pub orbits: OrbitConfig,
}

impl StackConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        let path = path.as_ref();
        log::debug!("Parsing parameter file {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|e| SarError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> SarResult<Self> {
        toml::from_str(contents)
            .map_err(|e| SarError::Config(format!("Couldn't decode toml structure: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_defaults() {
        let config = StackConfig::from_toml("").unwrap();
        assert_eq!(config, StackConfig::default());
        assert_eq!(config.select.bcrit, 200.0);
        assert_eq!(config.select.method, SelectionMethod::Delaunay);
        assert_eq!(config.orbits.precise_age_days, 20);
    }

    #[test]
    fn test_partial_file() {
        let config = StackConfig::from_toml(indoc! {r#"
            [select]
            bcrit = 150.0
            method = "all"
            event = "2016-08-24"
            short_gap_source = "filtered"

            [tops]
            filter_wavelength = 100
        "#})
        .unwrap();
        assert_eq!(config.select.bcrit, 150.0);
        assert_eq!(config.select.tcrit, 9999);
        assert_eq!(config.select.method, SelectionMethod::All);
        assert_eq!(config.select.event, NaiveDate::from_ymd_opt(2016, 8, 24));
        assert_eq!(config.select.short_gap_source, ShortGapSource::Filtered);
        assert_eq!(config.tops.filter_wavelength, 100);
        assert_eq!(config.tops.dec_factor, 2);
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(matches!(
            StackConfig::from_toml("[select]\nbperp = 1.0\n"),
            Err(SarError::Config(_))
        ));
    }

    #[test]
    fn test_month_range() {
        let mut config = SelectionConfig::default();
        assert!(config.validate().is_ok());
        config.month_min = 11;
        config.month_max = 2;
        assert!(matches!(config.validate(), Err(SarError::Config(_))));
        config.month_max = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_method_names() {
        assert_eq!("del".parse::<SelectionMethod>().unwrap(), SelectionMethod::Delaunay);
        assert_eq!("ALL".parse::<SelectionMethod>().unwrap(), SelectionMethod::All);
        assert!("sbas".parse::<SelectionMethod>().is_err());
    }

    #[test]
    fn test_event_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2016, 8, 24).unwrap();
        assert_eq!(parse_event_date("2016-08-24").unwrap(), expected);
        assert_eq!(parse_event_date("20160824").unwrap(), expected);
        assert!(parse_event_date("24/08/2016").is_err());
    }

    #[test]
    fn test_config_text() {
        let text = TopsProcessingConfig::default().to_config_text();
        assert!(text.starts_with("proc_stage = 4\ntopo_phase = 1\n"));
        assert!(text.contains("threshold_snaphu = 0.1\n"));
        assert!(text.ends_with("threshold_geocode = 0.1\n"));
        assert_eq!(text.lines().count(), 10);
    }
}
