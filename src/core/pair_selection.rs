//! SBAS interferogram pair selection.
//!
//! Scenes are placed in a plane of scaled temporal baseline against
//! perpendicular baseline. The Delaunay edges of that point set, limited by
//! the critical baselines and topped up with every short temporal gap,
//! form the default network; the alternative keeps every pair within the
//! critical baselines.

use crate::config::{SelectionConfig, SelectionMethod, ShortGapSource, TopsProcessingConfig};
use crate::core::delaunay::delaunay_edges;
use crate::types::{Pair, SarError, SarResult, Scene};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Pair manifest, one `stem1:stem2` per line
pub const INTF_FILE: &str = "intf.in";
/// Shell script with one interferogram command per pair
pub const RUN_SCRIPT_FILE: &str = "run_p2pTOPS";
/// Static parameters for the interferogram script
pub const TOPS_CONFIG_FILE: &str = "config.tops.txt";
/// Per-pair processing script invoked from [`RUN_SCRIPT_FILE`]
pub const P2P_SCRIPT: &str = "p2p_S1A_TOPS.csh";

/// Result of one pair selection run
#[derive(Debug, Clone)]
pub struct PairNetwork {
    /// Scenes kept by the month filter, in date order; pairs index into this
    pub scenes: Vec<Scene>,
    /// Days since the first scene
    pub temporal_baselines: Vec<i64>,
    /// Every Delaunay edge, before any threshold
    pub geometry_edges: Vec<Pair>,
    /// Exhaustive pairs within the critical baselines
    pub all_pairs: Vec<Pair>,
    /// Delaunay pairs within the critical baselines plus short-gap pairs
    pub delaunay_pairs: Vec<Pair>,
    /// Final network, sorted
    pub selected: Vec<Pair>,
    pub event: Option<NaiveDate>,
}

impl PairNetwork {
    pub fn perpendicular_baselines(&self) -> Vec<f64> {
        perpendicular_baselines(&self.scenes)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.scenes.iter().map(|s| s.date).collect()
    }
}

fn perpendicular_baselines(scenes: &[Scene]) -> Vec<f64> {
    scenes.iter().map(|s| s.perpendicular_baseline).collect()
}

/// Keep scenes acquired in months `month_min..=month_max`
pub fn filter_by_month(scenes: &[Scene], month_min: u32, month_max: u32) -> Vec<Scene> {
    scenes
        .iter()
        .filter(|s| (month_min..=month_max).contains(&s.date.month()))
        .cloned()
        .collect()
}

/// Days elapsed since the earliest scene
pub fn temporal_baselines(scenes: &[Scene]) -> Vec<i64> {
    let Some(first) = scenes.iter().map(|s| s.date).min() else {
        return Vec::new();
    };
    scenes.iter().map(|s| (s.date - first).num_days()).collect()
}

/// Every unordered pair of `n` scenes, lower index first
pub fn exhaustive_pairs(n: usize) -> Vec<Pair> {
    (0..n).tuple_combinations().map(|(a, b)| Pair(a, b)).collect()
}

/// Drop pairs whose perpendicular baseline difference exceeds `bcrit` or
/// whose temporal baseline difference exceeds `tcrit`
pub fn remove_bad_pairs(pairs: &[Pair], pbase: &[f64], tbase: &[i64], bcrit: f64, tcrit: i64) -> Vec<Pair> {
    pairs
        .iter()
        .filter(|&&Pair(a, b)| {
            let baseline = pbase[a] - pbase[b];
            baseline.abs() <= bcrit && tbase[b] - tbase[a] <= tcrit
        })
        .copied()
        .collect()
}

/// Temporal axis stretched so its extent matches the perpendicular baseline
/// range. The divisor is the largest temporal baseline; without a temporal
/// or baseline spread the days are used unscaled.
pub fn scaled_temporal_axis(tbase: &[i64], pbase: &[f64]) -> Vec<f64> {
    let t_max = tbase.iter().copied().max().unwrap_or(0);
    let p_min = pbase.iter().copied().fold(f64::INFINITY, f64::min);
    let p_max = pbase.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let p_range = p_max - p_min;

    let factor = if t_max > 0 && p_range > 0.0 {
        p_range / t_max as f64
    } else {
        log::debug!("No baseline spread to scale against, using days as the temporal axis");
        1.0
    };
    tbase.iter().map(|&t| t as f64 * factor).collect()
}

/// Delaunay edges over (scaled temporal baseline, perpendicular baseline),
/// lower index first, ordered by first index
pub fn geometry_pairs(tbase: &[i64], pbase: &[f64]) -> Vec<Pair> {
    let x = scaled_temporal_axis(tbase, pbase);
    let points: Vec<(f64, f64)> = x.into_iter().zip(pbase.iter().copied()).collect();

    let mut pairs: Vec<Pair> = delaunay_edges(&points)
        .into_iter()
        .map(|(a, b)| Pair::canonical(a, b))
        .collect();
    pairs.sort_by_key(|p| p.0);
    pairs
}

/// Append candidates at most `dmax` days apart that are not already present
pub fn add_short_gap_pairs(pairs: &mut Vec<Pair>, candidates: &[Pair], tbase: &[i64], dmax: i64) {
    let mut present: HashSet<Pair> = pairs.iter().copied().collect();
    for &pair in candidates {
        if tbase[pair.1] - tbase[pair.0] <= dmax && present.insert(pair) {
            pairs.push(pair);
        }
    }
}

/// Keep pairs with one scene strictly before `event` and the other strictly after
pub fn filter_event_span(pairs: &[Pair], dates: &[NaiveDate], event: NaiveDate) -> Vec<Pair> {
    pairs
        .iter()
        .filter(|&&Pair(a, b)| {
            (dates[a] < event && dates[b] > event) || (dates[b] < event && dates[a] > event)
        })
        .copied()
        .collect()
}

/// Run the full selection over a baseline table
pub fn select_pairs(scenes: &[Scene], config: &SelectionConfig) -> SarResult<PairNetwork> {
    config.validate()?;

    let mut filtered = filter_by_month(scenes, config.month_min, config.month_max);
    filtered.sort_by_key(|s| s.date);
    log::info!("Total # of scenes: {}", scenes.len());
    log::info!("Total after filtering by month: {}", filtered.len());
    if filtered.is_empty() {
        return Err(SarError::Processing(format!(
            "No scenes acquired in months {}-{}",
            config.month_min, config.month_max
        )));
    }

    let tbase = temporal_baselines(&filtered);
    let pbase = perpendicular_baselines(&filtered);

    let exhaustive = exhaustive_pairs(filtered.len());
    log::info!("all possible pairs = {}", exhaustive.len());
    let all_pairs = remove_bad_pairs(&exhaustive, &pbase, &tbase, config.bcrit, config.tcrit);
    log::info!(
        "all pairs with baselines less than Bcrit ({} m) and Tcrit ({} days): {}",
        config.bcrit,
        config.tcrit,
        all_pairs.len()
    );

    let geometry_edges = geometry_pairs(&tbase, &pbase);
    log::info!("delaunay possible pairs = {}", geometry_edges.len());
    let mut delaunay_pairs = remove_bad_pairs(&geometry_edges, &pbase, &tbase, config.bcrit, config.tcrit);
    log::info!(
        "delaunay pairs with baselines less than Bcrit ({} m) and Tcrit ({} days): {}",
        config.bcrit,
        config.tcrit,
        delaunay_pairs.len()
    );

    let short_gap_candidates = match config.short_gap_source {
        ShortGapSource::Exhaustive => &exhaustive,
        ShortGapSource::Filtered => &all_pairs,
    };
    add_short_gap_pairs(&mut delaunay_pairs, short_gap_candidates, &tbase, config.dmax);
    log::info!(
        "delaunay pairs with added pairs less than {} days = {}",
        config.dmax,
        delaunay_pairs.len()
    );

    let mut selected = match config.method {
        SelectionMethod::All => all_pairs.clone(),
        SelectionMethod::Delaunay => delaunay_pairs.clone(),
    };

    if let Some(event) = config.event {
        let dates: Vec<NaiveDate> = filtered.iter().map(|s| s.date).collect();
        selected = filter_event_span(&selected, &dates, event);
        log::info!("# of pairs spanning {}: {}", event, selected.len());
    }

    selected.sort();
    selected.dedup();

    Ok(PairNetwork {
        scenes: filtered,
        temporal_baselines: tbase,
        geometry_edges,
        all_pairs,
        delaunay_pairs,
        selected,
        event: config.event,
    })
}

/// Files written for a selected network
#[derive(Debug, Clone)]
pub struct SelectionOutputs {
    pub manifest: PathBuf,
    pub run_script: PathBuf,
    pub tops_config: PathBuf,
}

/// Write the pair manifest, the per-pair command script and the static
/// interferogram parameters into `output_dir`
pub fn write_selection<P: AsRef<Path>>(
    network: &PairNetwork,
    tops: &TopsProcessingConfig,
    output_dir: P,
) -> SarResult<SelectionOutputs> {
    let output_dir = output_dir.as_ref();
    let outputs = SelectionOutputs {
        manifest: output_dir.join(INTF_FILE),
        run_script: output_dir.join(RUN_SCRIPT_FILE),
        tops_config: output_dir.join(TOPS_CONFIG_FILE),
    };

    let mut manifest = BufWriter::new(File::create(&outputs.manifest)?);
    let mut script = BufWriter::new(File::create(&outputs.run_script)?);
    for &Pair(a, b) in &network.selected {
        let first = network.scenes[a].product_stem();
        let second = network.scenes[b].product_stem();
        writeln!(manifest, "{}:{}", first, second)?;
        writeln!(script, "{} {} {} {}", P2P_SCRIPT, first, second, TOPS_CONFIG_FILE)?;
    }
    manifest.flush()?;
    script.flush()?;

    std::fs::write(&outputs.tops_config, tops.to_config_text())?;

    log::info!(
        "Wrote {} pairs to {} and {}",
        network.selected.len(),
        outputs.manifest.display(),
        outputs.run_script.display()
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(date: &str, bperp: f64) -> Scene {
        Scene {
            label: date.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y%m%d").unwrap(),
            perpendicular_baseline: bperp,
            parallel_baseline: 0.0,
            product: PathBuf::from(format!("IW1_{}.SLC", date)),
        }
    }

    #[test]
    fn test_month_filter_is_inclusive() {
        let scenes = vec![scene("20160430", 0.0), scene("20160501", 0.0), scene("20161031", 0.0), scene("20161101", 0.0)];
        let kept = filter_by_month(&scenes, 5, 10);
        let labels: Vec<&str> = kept.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["20160501", "20161031"]);
    }

    #[test]
    fn test_temporal_baselines_from_earliest() {
        let scenes = vec![scene("20160513", 0.0), scene("20160501", 0.0), scene("20170501", 0.0)];
        assert_eq!(temporal_baselines(&scenes), vec![12, 0, 365]);
    }

    #[test]
    fn test_exhaustive_pairs() {
        assert_eq!(exhaustive_pairs(3), vec![Pair(0, 1), Pair(0, 2), Pair(1, 2)]);
        assert!(exhaustive_pairs(1).is_empty());
    }

    #[test]
    fn test_threshold_is_symmetric_and_inclusive() {
        let pbase = [0.0, 200.0, -200.5];
        let tbase = [0, 10, 20];
        let kept = remove_bad_pairs(&exhaustive_pairs(3), &pbase, &tbase, 200.0, 15);
        assert_eq!(kept, vec![Pair(0, 1)]);
    }

    #[test]
    fn test_scaling_divides_by_largest_temporal_baseline() {
        let x = scaled_temporal_axis(&[0, 12, 48], &[10.0, -50.0, 70.0]);
        assert_eq!(x, vec![0.0, 30.0, 120.0]);
        // Identical baselines fall back to days
        assert_eq!(scaled_temporal_axis(&[0, 12], &[5.0, 5.0]), vec![0.0, 12.0]);
    }

    #[test]
    fn test_short_gap_union_skips_present_pairs() {
        let mut pairs = vec![Pair(0, 2)];
        add_short_gap_pairs(&mut pairs, &[Pair(0, 1), Pair(0, 2), Pair(1, 2), Pair(0, 3)], &[0, 12, 24, 96], 24);
        assert_eq!(pairs, vec![Pair(0, 2), Pair(0, 1), Pair(1, 2)]);
    }

    #[test]
    fn test_four_date_scenario() {
        let scenes = vec![
            scene("20160501", 0.0),
            scene("20160513", 50.0),
            scene("20160525", 120.0),
            scene("20160606", 250.0),
        ];
        let config = SelectionConfig {
            method: SelectionMethod::All,
            ..SelectionConfig::default()
        };
        let network = select_pairs(&scenes, &config).unwrap();
        assert_eq!(
            network.selected,
            vec![Pair(0, 1), Pair(0, 2), Pair(1, 2), Pair(1, 3), Pair(2, 3)]
        );
    }

    #[test]
    fn test_empty_after_month_filter() {
        let config = SelectionConfig {
            month_min: 6,
            month_max: 8,
            ..SelectionConfig::default()
        };
        assert!(matches!(
            select_pairs(&[scene("20160501", 0.0)], &config),
            Err(SarError::Processing(_))
        ));
    }

    #[test]
    fn test_event_span_is_strict() {
        let dates: Vec<NaiveDate> = ["20160501", "20160513", "20160525"]
            .iter()
            .map(|d| NaiveDate::parse_from_str(d, "%Y%m%d").unwrap())
            .collect();
        let pairs = exhaustive_pairs(3);
        assert_eq!(filter_event_span(&pairs, &dates, dates[1]), vec![Pair(0, 2)]);
        let event = NaiveDate::from_ymd_opt(2016, 5, 2).unwrap();
        assert_eq!(filter_event_span(&pairs, &dates, event), vec![Pair(0, 1), Pair(0, 2)]);
        // Orientation does not matter
        assert_eq!(filter_event_span(&[Pair(2, 0)], &dates, event), vec![Pair(2, 0)]);
    }

    #[test]
    fn test_write_selection() {
        let dir = tempfile::tempdir().unwrap();
        let scenes = vec![scene("20160501", 0.0), scene("20160513", 20.0), scene("20160525", -15.0)];
        let network = select_pairs(&scenes, &SelectionConfig::default()).unwrap();
        let outputs = write_selection(&network, &TopsProcessingConfig::default(), dir.path()).unwrap();

        let manifest = std::fs::read_to_string(&outputs.manifest).unwrap();
        assert_eq!(
            manifest,
            "IW1_20160501:IW1_20160513\nIW1_20160501:IW1_20160525\nIW1_20160513:IW1_20160525\n"
        );
        let script = std::fs::read_to_string(&outputs.run_script).unwrap();
        assert_eq!(
            script.lines().next().unwrap(),
            "p2p_S1A_TOPS.csh IW1_20160501 IW1_20160513 config.tops.txt"
        );
        assert!(std::fs::read_to_string(&outputs.tops_config).unwrap().starts_with("proc_stage = 4\n"));
    }
}
