use crate::types::{PassDirection, SarError, SarResult, SubswathMetadata, SPEED_OF_LIGHT};
use chrono::NaiveDateTime;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::path::Path;

/// Sentinel-1 sub-swath annotation, rooted at the `<product>` element.
/// Only the fields needed to prepare a GMTSAR stack are mapped.
#[derive(Debug, Deserialize)]
pub struct AnnotationRoot {
    #[serde(rename = "adsHeader")]
    pub ads_header: AdsHeader,
    #[serde(rename = "generalAnnotation")]
    pub general_annotation: GeneralAnnotation,
    #[serde(rename = "imageAnnotation")]
    pub image_annotation: ImageAnnotation,
    #[serde(rename = "swathTiming")]
    pub swath_timing: SwathTiming,
}

#[derive(Debug, Deserialize)]
pub struct AdsHeader {
    #[serde(rename = "missionId")]
    pub mission_id: String,
    #[serde(rename = "productType")]
    pub product_type: String,
    #[serde(rename = "polarisation")]
    pub polarisation: String,
    #[serde(rename = "mode")]
    pub mode: String,
    #[serde(rename = "swath")]
    pub swath: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "stopTime")]
    pub stop_time: String,
    #[serde(rename = "absoluteOrbitNumber")]
    pub absolute_orbit_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct GeneralAnnotation {
    #[serde(rename = "productInformation")]
    pub product_information: ProductInformation,
    #[serde(rename = "downlinkInformationList")]
    pub downlink_information_list: DownlinkInformationList,
    #[serde(rename = "terrainHeightList")]
    pub terrain_height_list: TerrainHeightList,
}

#[derive(Debug, Deserialize)]
pub struct ProductInformation {
    #[serde(rename = "pass")]
    pub pass: String,
    #[serde(rename = "rangeSamplingRate")]
    pub range_sampling_rate: f64,
    #[serde(rename = "radarFrequency")]
    pub radar_frequency: f64,
}

#[derive(Debug, Deserialize)]
pub struct DownlinkInformationList {
    #[serde(rename = "downlinkInformation", default)]
    pub items: Vec<DownlinkInformation>,
}

#[derive(Debug, Deserialize)]
pub struct DownlinkInformation {
    #[serde(rename = "prf")]
    pub prf: f64,
}

#[derive(Debug, Deserialize)]
pub struct TerrainHeightList {
    #[serde(rename = "terrainHeight", default)]
    pub items: Vec<TerrainHeight>,
}

#[derive(Debug, Deserialize)]
pub struct TerrainHeight {
    #[serde(rename = "value")]
    pub value: TextValue,
}

/// Element carrying attributes (e.g. `count`) around a numeric text node
#[derive(Debug, Deserialize)]
pub struct TextValue {
    #[serde(rename = "$text")]
    pub value: f64,
}

#[derive(Debug, Deserialize)]
pub struct ImageAnnotation {
    #[serde(rename = "imageInformation")]
    pub image_information: ImageInformation,
}

#[derive(Debug, Deserialize)]
pub struct ImageInformation {
    #[serde(rename = "slantRangeTime")]
    pub slant_range_time: f64,
    #[serde(rename = "azimuthPixelSpacing")]
    pub azimuth_pixel_spacing: f64,
    #[serde(rename = "azimuthTimeInterval")]
    pub azimuth_time_interval: f64,
    #[serde(rename = "incidenceAngleMidSwath")]
    pub incidence_angle_mid_swath: f64,
}

#[derive(Debug, Deserialize)]
pub struct SwathTiming {
    #[serde(rename = "linesPerBurst")]
    pub lines_per_burst: usize,
    #[serde(rename = "samplesPerBurst")]
    pub samples_per_burst: usize,
}

/// Parser for Sentinel-1 annotation XML files
pub struct AnnotationParser;

impl AnnotationParser {
    /// Parse complete annotation XML
    pub fn parse_annotation(xml_content: &str) -> SarResult<AnnotationRoot> {
        from_str::<AnnotationRoot>(xml_content)
            .map_err(|e| SarError::XmlParsing(format!("Failed to parse annotation XML: {}", e)))
    }

    /// Read an annotation file and reduce it to sub-swath metadata
    pub fn read_metadata<P: AsRef<Path>>(path: P) -> SarResult<SubswathMetadata> {
        log::debug!("Parsing annotation: {}", path.as_ref().display());
        let content = std::fs::read_to_string(path)?;
        Self::parse_metadata(&content)
    }

    /// Parse annotation XML into sub-swath metadata
    pub fn parse_metadata(xml_content: &str) -> SarResult<SubswathMetadata> {
        let root = Self::parse_annotation(xml_content)?;
        Self::extract_metadata(&root)
    }

    /// Reduce a parsed annotation to the values GMTSAR needs
    pub fn extract_metadata(root: &AnnotationRoot) -> SarResult<SubswathMetadata> {
        let header = &root.ads_header;
        let general = &root.general_annotation;
        let image = &root.image_annotation.image_information;

        let prf = general
            .downlink_information_list
            .items
            .first()
            .map(|d| d.prf)
            .ok_or_else(|| SarError::Metadata("No downlinkInformation in annotation".to_string()))?;
        let terrain_height = general
            .terrain_height_list
            .items
            .first()
            .map(|t| t.value.value)
            .ok_or_else(|| SarError::Metadata("No terrainHeight in annotation".to_string()))?;

        let range_sampling_rate = general.product_information.range_sampling_rate;
        if range_sampling_rate <= 0.0 {
            return Err(SarError::Metadata(format!(
                "Invalid range sampling rate: {}",
                range_sampling_rate
            )));
        }

        Ok(SubswathMetadata {
            mission_id: header.mission_id.clone(),
            product_type: header.product_type.clone(),
            polarisation: header.polarisation.clone(),
            mode: header.mode.clone(),
            swath: header.swath.clone(),
            absolute_orbit_number: header.absolute_orbit_number,
            start_time: Self::parse_time(&header.start_time)?,
            stop_time: Self::parse_time(&header.stop_time)?,
            pass_direction: Self::parse_pass(&general.product_information.pass)?,
            radar_frequency: general.product_information.radar_frequency,
            range_sampling_rate,
            range_pixel_size: SPEED_OF_LIGHT / (2.0 * range_sampling_rate),
            azimuth_pixel_size: image.azimuth_pixel_spacing,
            azimuth_time_interval: image.azimuth_time_interval,
            starting_range: image.slant_range_time * SPEED_OF_LIGHT / 2.0,
            incidence_angle: image.incidence_angle_mid_swath,
            prf,
            terrain_height,
            lines_per_burst: root.swath_timing.lines_per_burst,
            samples_per_burst: root.swath_timing.samples_per_burst,
        })
    }

    /// Annotation times are UTC without zone, e.g. `2016-05-01T01:23:45.123456`
    pub fn parse_time(time_str: &str) -> SarResult<NaiveDateTime> {
        NaiveDateTime::parse_from_str(time_str.trim(), "%Y-%m-%dT%H:%M:%S%.f")
            .map_err(|e| SarError::Metadata(format!("Invalid annotation time '{}': {}", time_str, e)))
    }

    fn parse_pass(pass: &str) -> SarResult<PassDirection> {
        match pass.trim().to_ascii_lowercase().as_str() {
            "ascending" => Ok(PassDirection::Ascending),
            "descending" => Ok(PassDirection::Descending),
            other => Err(SarError::Metadata(format!("Unknown pass direction: {}", other))),
        }
    }
}
