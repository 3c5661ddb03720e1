//! Baseline table computation against a reference scene.
//!
//! `SAT_baseline` is run for every parameter file of the stack against the
//! reference. Its `B_perpendicular` and `B_parallel` output become one
//! row of `bl_list.txt` each.

use crate::io::baseline_table::BaselineTable;
use crate::io::prm::{append_to_prm, PrmFile};
use crate::tools::{invoke_key_values, value_f64, ToolRunner};
use crate::types::{parse_scene_date, SarError, SarResult, Scene};
use std::path::{Path, PathBuf};

/// Directory holding the prepared scenes of a stack, when present
pub const SLC_DIR: &str = "SLC";

const BASELINE_TOOL: &str = "SAT_baseline";
const DOPPLER_TOOL: &str = "calc_dop_orb";

/// Where the scenes of `workdir` live: `SLC/` if it exists, else `workdir` itself
pub fn scene_directory<P: AsRef<Path>>(workdir: P) -> PathBuf {
    let slc = workdir.as_ref().join(SLC_DIR);
    if slc.is_dir() {
        slc
    } else {
        workdir.as_ref().to_path_buf()
    }
}

/// Parameter files in `dir`, sorted by name
pub fn list_prm_files<P: AsRef<Path>>(dir: P) -> SarResult<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.PRM",
        glob::Pattern::escape(&dir.as_ref().to_string_lossy())
    );
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| SarError::Processing(format!("Bad glob pattern: {}", e)))? {
        let path = entry.map_err(|e| SarError::Io(e.into_error()))?;
        files.push(path);
    }
    files.sort();
    Ok(files)
}

/// First parameter file (by name) whose name contains `date`
pub fn find_reference_prm(prm_files: &[PathBuf], date: &str) -> SarResult<PathBuf> {
    prm_files
        .iter()
        .find(|p| file_name(p).contains(date))
        .cloned()
        .ok_or_else(|| SarError::Processing(format!("No PRM file for reference date {}", date)))
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

/// Scene identifier from a parameter file stem: `IW1_20160501` gives
/// `20160501`, a stem without `_` is used whole
pub fn scene_label(stem: &str) -> &str {
    stem.split('_').nth(1).unwrap_or(stem)
}

/// Run the doppler tool on a parameter file and append its log to it.
/// `prm` is resolved in `dir`, the directory the runner works in.
pub fn calc_dop_orb<R: ToolRunner + ?Sized>(runner: &R, dir: &Path, prm: &Path) -> SarResult<()> {
    let prm_name = file_name(prm);
    let log_name = format!("{}.log", file_stem(prm));

    runner.run(
        DOPPLER_TOOL,
        &[prm_name.clone(), log_name.clone(), "0".to_string(), "0".to_string()],
    )?;

    let log_path = dir.join(&log_name);
    let log_text = std::fs::read_to_string(&log_path).map_err(|e| SarError::Tool {
        tool: DOPPLER_TOOL.to_string(),
        message: format!("no log {}: {}", log_path.display(), e),
    })?;
    append_to_prm(dir.join(&prm_name), &log_text)?;
    std::fs::remove_file(&log_path)?;
    log::debug!("Appended doppler parameters to {}", prm_name);
    Ok(())
}

/// Compute baselines of every scene in `scene_dir` against the scene of
/// `reference_date` and write them as a baseline table to `table_path`.
///
/// `runner` must execute tools inside `scene_dir`.
pub fn compute_baselines<R: ToolRunner + ?Sized>(
    runner: &R,
    scene_dir: &Path,
    reference_date: &str,
    table_path: &Path,
) -> SarResult<Vec<Scene>> {
    let prm_files = list_prm_files(scene_dir)?;
    if prm_files.is_empty() {
        return Err(SarError::Processing(format!(
            "No PRM files in {}",
            scene_dir.display()
        )));
    }
    let reference = find_reference_prm(&prm_files, reference_date)?;
    let reference_name = file_name(&reference);
    log::info!("Reference PRM: {}", reference_name);

    let mut scenes = Vec::with_capacity(prm_files.len());
    for prm in &prm_files {
        let params = PrmFile::read(prm)?;
        if !params.contains("SC_vel") {
            log::info!("{} has no SC_vel, computing doppler", file_name(prm));
            calc_dop_orb(runner, scene_dir, prm)?;
        }

        let values = invoke_key_values(
            runner,
            BASELINE_TOOL,
            &[reference_name.clone(), file_name(prm)],
            &["B_perpendicular", "B_parallel"],
        )?;
        let stem = file_stem(prm);
        let label = scene_label(&stem).to_string();

        scenes.push(Scene {
            date: parse_scene_date(&label)?,
            perpendicular_baseline: value_f64(&values, "B_perpendicular", BASELINE_TOOL)?,
            parallel_baseline: value_f64(&values, "B_parallel", BASELINE_TOOL)?,
            product: PathBuf::from(format!("{}.SLC", stem)),
            label,
        });
    }

    BaselineTable::write(table_path, &scenes)?;

    if let Some(optimal) = optimal_reference(&scenes) {
        log::info!("OPTIMAL REFERENCE DATE: {}", optimal.label);
    }
    Ok(scenes)
}

/// Scene whose perpendicular baseline is closest to the mean of all; the
/// first one wins ties
pub fn optimal_reference(scenes: &[Scene]) -> Option<&Scene> {
    if scenes.is_empty() {
        return None;
    }
    let mean = scenes.iter().map(|s| s.perpendicular_baseline).sum::<f64>() / scenes.len() as f64;

    let mut best: Option<(&Scene, f64)> = None;
    for scene in scenes {
        let deviation = (scene.perpendicular_baseline - mean).abs();
        match best {
            Some((_, d)) if d <= deviation => {}
            _ => best = Some((scene, deviation)),
        }
    }
    best.map(|(scene, _)| scene)
}
