use crate::config::OrbitConfig;
use crate::types::{SarError, SarResult, SubswathMetadata};
use chrono::{NaiveDateTime, Utc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Orbit file types available from the orbit archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitType {
    /// Precise Orbit Ephemerides (best accuracy, ~20 days delay)
    POEORB,
    /// Restituted Orbit Ephemerides (lower accuracy, ~3 hours delay)
    RESORB,
}

impl OrbitType {
    /// Directory of this orbit type below the archive root
    pub fn archive_dir(&self) -> &'static str {
        match self {
            OrbitType::POEORB => "aux_poeorb",
            OrbitType::RESORB => "aux_resorb",
        }
    }

    /// Precise orbits once the scene is older than `precise_age_days`, restituted before
    pub fn for_acquisition(
        acquisition_time: NaiveDateTime,
        now: NaiveDateTime,
        precise_age_days: i64,
    ) -> OrbitType {
        let age_days = (now - acquisition_time).num_days();

        if age_days > precise_age_days {
            OrbitType::POEORB
        } else {
            OrbitType::RESORB
        }
    }
}

impl std::fmt::Display for OrbitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrbitType::POEORB => write!(f, "POEORB"),
            OrbitType::RESORB => write!(f, "RESORB"),
        }
    }
}

/// An orbit file name with its validity window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitFileEntry {
    pub name: String,
    pub validity_start: NaiveDateTime,
    pub validity_stop: NaiveDateTime,
}

impl OrbitFileEntry {
    /// Parse `S1A_OPER_AUX_POEORB_OPOD_<prod>_V<start>_<stop>.EOF`
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        let stem = name.strip_suffix(".zip").unwrap_or(name);
        let stem = stem.strip_suffix(".EOF").unwrap_or(stem);
        let (_, validity) = stem.split_once("_V")?;
        let mut parts = validity.split('_');
        let validity_start = Self::parse_time(parts.next()?)?;
        let validity_stop = Self::parse_time(parts.next()?)?;

        Some(Self {
            name: name.to_string(),
            validity_start,
            validity_stop,
        })
    }

    /// Validity strictly encloses the acquisition window
    pub fn covers(&self, start: NaiveDateTime, stop: NaiveDateTime) -> bool {
        self.validity_start < start && self.validity_stop > stop
    }

    fn parse_time(time_str: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(time_str, "%Y%m%dT%H%M%S").ok()
    }
}

/// Orbit file names linked from an HTML directory listing
pub fn parse_orbit_listing(html: &str) -> SarResult<Vec<String>> {
    // Anchor text, e.g. <a href="...">S1A_OPER_AUX_POEORB_...EOF</a>
    let anchor = Regex::new(r"<a\s[^>]*>\s*([^<]*ORB_[^<]*?)\s*</a>")?;
    Ok(anchor
        .captures_iter(html)
        .map(|c| c[1].to_string())
        .collect())
}

/// Pick the orbit file covering an acquisition window; the last listed wins
pub fn select_orbit_file(
    names: &[String],
    start: NaiveDateTime,
    stop: NaiveDateTime,
) -> Option<OrbitFileEntry> {
    names
        .iter()
        .filter_map(|name| OrbitFileEntry::parse(name))
        .filter(|entry| entry.covers(start, stop))
        .last()
}

/// Anything that can provide a local orbit file for a scene
pub trait OrbitSource {
    /// Make an orbit file covering the scene available in `dest_dir` and return its path
    fn fetch_orbit(&self, meta: &SubswathMetadata, dest_dir: &Path) -> SarResult<PathBuf>;
}

/// Retrieves orbit files from an HTTP directory index
pub struct OrbitDownloader {
    config: OrbitConfig,
    client: reqwest::blocking::Client,
}

impl OrbitDownloader {
    pub fn new(config: OrbitConfig) -> SarResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SarError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn directory_url(&self, orbit_type: OrbitType) -> String {
        format!(
            "{}/{}/",
            self.config.base_url.trim_end_matches('/'),
            orbit_type.archive_dir()
        )
    }

    /// List orbit files of one type from the archive index
    pub fn list_orbit_files(&self, orbit_type: OrbitType) -> SarResult<Vec<String>> {
        let dir_url = self.directory_url(orbit_type);
        log::debug!("Checking directory: {}", dir_url);

        let response = self
            .client
            .get(&dir_url)
            .send()
            .map_err(|e| SarError::Network(format!("Failed to fetch directory listing: {}", e)))?;

        if !response.status().is_success() {
            return Err(SarError::Network(format!(
                "Directory listing {} failed: {}",
                dir_url,
                response.status()
            )));
        }

        let html = response
            .text()
            .map_err(|e| SarError::Network(format!("Failed to read response: {}", e)))?;

        let names = parse_orbit_listing(&html)?;
        log::debug!("{} orbit files listed in {}", names.len(), dir_url);
        Ok(names)
    }

    /// Download one orbit file into `dest_dir`, returning its local path
    fn download(&self, orbit_type: OrbitType, name: &str, dest_dir: &Path) -> SarResult<PathBuf> {
        let url = format!("{}{}", self.directory_url(orbit_type), name);
        log::info!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SarError::Network(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SarError::Network(format!(
                "HTTP request for {} failed with status: {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| SarError::Network(format!("Failed to read response bytes: {}", e)))?;

        let local_name = name.strip_suffix(".zip").unwrap_or(name);
        let path = dest_dir.join(local_name);

        if is_zip_content(&bytes) {
            log::debug!("Unpacking zipped orbit file from: {}", url);
            fs::write(&path, extract_eof_from_zip(&bytes)?)?;
        } else {
            fs::write(&path, &bytes)?;
        }

        log::info!("Orbit file saved to: {}", path.display());
        Ok(path)
    }
}

impl OrbitSource for OrbitDownloader {
    fn fetch_orbit(&self, meta: &SubswathMetadata, dest_dir: &Path) -> SarResult<PathBuf> {
        let orbit_type = OrbitType::for_acquisition(
            meta.start_time,
            Utc::now().naive_utc(),
            self.config.precise_age_days,
        );
        log::info!("Selected orbit type: {}", orbit_type);

        let names = self.list_orbit_files(orbit_type)?;
        let entry = select_orbit_file(&names, meta.start_time, meta.stop_time).ok_or_else(|| {
            SarError::Processing(format!(
                "No {} orbit file covers {} to {}",
                orbit_type, meta.start_time, meta.stop_time
            ))
        })?;

        let local = dest_dir.join(entry.name.strip_suffix(".zip").unwrap_or(&entry.name));
        if local.exists() {
            log::info!("Orbit already downloaded: {}", local.display());
            return Ok(local);
        }

        self.download(orbit_type, &entry.name, dest_dir)
    }
}

/// Check if content is a ZIP file by examining magic bytes
fn is_zip_content(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0..4] == [0x50, 0x4B, 0x03, 0x04]
}

/// Extract EOF content from ZIP file
fn extract_eof_from_zip(zip_bytes: &[u8]) -> SarResult<Vec<u8>> {
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|e| SarError::InvalidFormat(format!("Failed to read ZIP archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| SarError::InvalidFormat(format!("Failed to read ZIP entry {}: {}", i, e)))?;

        if file.name().ends_with(".EOF") {
            log::debug!("Found EOF file in ZIP: {}", file.name());
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
    }

    Err(SarError::InvalidFormat(
        "No .EOF file found in ZIP archive".to_string(),
    ))
}
