//! Sentinel-1 TOPS stack preparation.
//!
//! For every zipped SLC product in `raw/`, one sub-swath is unpacked into
//! `SLC/`, given an orbit, and turned into a GMTSAR scene with
//! `make_s1a_tops`, `ext_orb_s1a` and `calc_dop_orb`. The baseline table of
//! the finished stack then suggests the reference scene.

use crate::core::baselines::{calc_dop_orb, compute_baselines, optimal_reference, SLC_DIR};
use crate::io::annotation::AnnotationParser;
use crate::io::baseline_table::BASELINE_TABLE_FILE;
use crate::io::orbit::OrbitSource;
use crate::io::slc_reader::SlcReader;
use crate::tools::ToolRunner;
use crate::types::{SarError, SarResult, Scene, SubswathMetadata, SCENE_DATE_FORMAT};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Directory of the zipped input products
pub const RAW_DIR: &str = "raw";
/// `tiff_stem:orbit_file` per scene, read by the GMTSAR alignment scripts
pub const DATA_IN_FILE: &str = "data.in";

/// One scene after preparation
#[derive(Debug, Clone)]
pub struct PreparedScene {
    pub archive: PathBuf,
    pub metadata: SubswathMetadata,
    /// `<swath>_<YYYYMMDD>`, the name of the scene's PRM/SLC/LED files
    pub prefix: String,
    pub annotation: PathBuf,
    pub measurement: PathBuf,
    pub orbit: PathBuf,
}

impl PreparedScene {
    pub fn prm_name(&self) -> String {
        format!("{}.PRM", self.prefix)
    }

    /// `data.in` entry of this scene
    pub fn data_in_line(&self) -> String {
        format!("{}:{}", file_stem(&self.measurement), file_name(&self.orbit))
    }
}

/// Outcome of preparing a stack
#[derive(Debug, Clone)]
pub struct PreparedStack {
    pub scenes: Vec<PreparedScene>,
    pub baselines: Vec<Scene>,
    /// Label of the scene closest to the mean perpendicular baseline
    pub optimal_reference: Option<String>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Zipped IW SLC products in `<workdir>/raw`, sorted by name
pub fn list_raw_archives<P: AsRef<Path>>(workdir: P) -> SarResult<Vec<PathBuf>> {
    let raw = workdir.as_ref().join(RAW_DIR);
    let pattern = format!("{}/S1*_IW_SLC*.zip", glob::Pattern::escape(&raw.to_string_lossy()));
    let mut archives = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| SarError::Processing(format!("Bad glob pattern: {}", e)))? {
        archives.push(entry.map_err(|e| SarError::Io(e.into_error()))?);
    }
    archives.sort();
    Ok(archives)
}

/// Unpack and process one product. `runner` must execute tools inside `slc_dir`.
pub fn prepare_scene<R, O>(
    archive: &Path,
    swath: u8,
    slc_dir: &Path,
    runner: &R,
    orbits: &O,
) -> SarResult<PreparedScene>
where
    R: ToolRunner + ?Sized,
    O: OrbitSource + ?Sized,
{
    log::info!("Working on {}", archive.display());

    let mut reader = SlcReader::new(archive)?;
    let extracted = reader.extract_subswath(swath, slc_dir)?;
    let metadata = AnnotationParser::read_metadata(&extracted.annotation)?;
    log::debug!(
        "{} {} {} orbit {} ({}), {} to {}",
        metadata.mission_id,
        metadata.swath,
        metadata.polarisation,
        metadata.absolute_orbit_number,
        metadata.pass_direction,
        metadata.start_time,
        metadata.stop_time
    );

    let orbit = orbits.fetch_orbit(&metadata, slc_dir)?;
    let prefix = metadata.product_prefix();

    let scene = PreparedScene {
        archive: archive.to_path_buf(),
        prefix,
        annotation: extracted.annotation,
        measurement: extracted.measurement,
        orbit,
        metadata,
    };

    runner.run(
        "make_s1a_tops",
        &[
            file_name(&scene.annotation),
            file_name(&scene.measurement),
            scene.prefix.clone(),
            "0".to_string(),
        ],
    )?;
    runner.run(
        "ext_orb_s1a",
        &[scene.prm_name(), file_name(&scene.orbit), scene.prefix.clone()],
    )?;
    calc_dop_orb(runner, slc_dir, Path::new(&scene.prm_name()))?;

    Ok(scene)
}

/// Prepare every product of `<workdir>/raw` for sub-swath `swath` (1-3).
///
/// Writes `SLC/data.in` and `SLC/bl_list.txt`; baselines are computed
/// against the last scene processed. `runner` must execute tools inside
/// `<workdir>/SLC`.
pub fn prepare_tops_stack<R, O>(workdir: &Path, swath: u8, runner: &R, orbits: &O) -> SarResult<PreparedStack>
where
    R: ToolRunner + ?Sized,
    O: OrbitSource + ?Sized,
{
    if !(1..=3).contains(&swath) {
        return Err(SarError::Config(format!("IW sub-swath must be 1, 2 or 3, got {}", swath)));
    }

    let archives = list_raw_archives(workdir)?;
    if archives.is_empty() {
        return Err(SarError::Processing(format!(
            "No S1*_IW_SLC*.zip products in {}",
            workdir.join(RAW_DIR).display()
        )));
    }

    let slc_dir = workdir.join(SLC_DIR);
    std::fs::create_dir_all(&slc_dir)?;

    let mut data_in = BufWriter::new(File::create(slc_dir.join(DATA_IN_FILE))?);
    let mut scenes = Vec::with_capacity(archives.len());
    for archive in &archives {
        let scene = prepare_scene(archive, swath, &slc_dir, runner, orbits)?;
        writeln!(data_in, "{}", scene.data_in_line())?;
        scenes.push(scene);
    }
    data_in.flush()?;

    let last_date = scenes
        .last()
        .map(|s| s.metadata.start_time.format(SCENE_DATE_FORMAT).to_string())
        .ok_or_else(|| SarError::Processing("No scenes prepared".to_string()))?;

    let baselines = compute_baselines(runner, &slc_dir, &last_date, &slc_dir.join(BASELINE_TABLE_FILE))?;
    let optimal = optimal_reference(&baselines).map(|s| s.label.clone());

    Ok(PreparedStack {
        scenes,
        baselines,
        optimal_reference: optimal,
    })
}
