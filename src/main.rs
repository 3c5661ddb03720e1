use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gmtsar_stack::config::{parse_event_date, SelectionMethod, ShortGapSource, StackConfig};
use gmtsar_stack::core::{baselines, jobs, network_plot, pair_selection, tops_stack};
use gmtsar_stack::io::{extract_led, update_prm, BaselineTable, OrbitDownloader, PrmFile, BASELINE_TABLE_FILE};
use gmtsar_stack::ExternalTools;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Stack preparation and SBAS pair selection for GMTSAR")]
struct Cli {
    /// The verbosity of the program. Increase by specifying multiple times (e.g. -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML parameter file. Command-line arguments override values set in the file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the state vectors of an ALOS leader file to YYYYMMDD.LED
    ExtractLed {
        leader_file: PathBuf,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Print one value of a PRM file
    PrmGet { prm_file: PathBuf, key: String },

    /// Set a value in a PRM file; the key is matched as a regular expression
    PrmSet {
        prm_file: PathBuf,
        key: String,
        value: String,
    },

    /// Compute bl_list.txt against a reference date and report the optimal reference
    Baselines {
        reference_date: String,
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,
    },

    /// Select interferogram pairs from a baseline table
    SelectPairs {
        /// Baseline list
        #[arg(short = 'i', long, default_value = BASELINE_TABLE_FILE)]
        infile: PathBuf,
        /// First month of year to keep
        #[arg(long)]
        month_min: Option<u32>,
        /// Last month of year to keep
        #[arg(long)]
        month_max: Option<u32>,
        /// Pair selection method: all or del(aunay)
        #[arg(long)]
        method: Option<SelectionMethod>,
        /// Critical perpendicular baseline (meters)
        #[arg(long)]
        bcrit: Option<f64>,
        /// Critical temporal baseline (days)
        #[arg(long)]
        tcrit: Option<i64>,
        /// Max. number of days for adding additional pairs
        #[arg(long)]
        dmax: Option<i64>,
        /// Only add short-gap pairs that pass the baseline thresholds
        #[arg(long)]
        filtered_short_gaps: bool,
        /// Date the interferograms must span, e.g. an event (YYYY-MM-DD)
        #[arg(long)]
        span: Option<String>,
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Don't write the network plot
        #[arg(long)]
        no_plot: bool,
    },

    /// Extract, orbit-correct and align Sentinel-1 TOPS scenes from raw/ into SLC/
    PrepareTops {
        /// Sub-swath number (without IW)
        #[arg(short, long)]
        swath: u8,
        #[arg(short, long, default_value = ".")]
        workdir: PathBuf,
    },

    /// Run the command lines of a file on a pool of workers
    RunJobs { job_file: PathBuf, workers: usize },

    /// Plot perpendicular baseline against date from a baseline table
    PlotBaselines {
        table: PathBuf,
        #[arg(short, long, default_value = "baselines.svg")]
        output: PathBuf,
    },
}

fn setup_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    builder.format_target(false);
    builder.filter_level(match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    });
    // RUST_LOG still overrides the command-line level
    builder.parse_default_env();
    builder.init();
}

/// Name of the directory a project lives in
fn project_name(dir: &Path) -> String {
    dir.canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "project".to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => StackConfig::load(path)?,
        None => StackConfig::default(),
    };

    match cli.command {
        Command::ExtractLed {
            leader_file,
            output_dir,
        } => {
            extract_led(&leader_file, &output_dir)
                .with_context(|| format!("Extracting state vectors from {}", leader_file.display()))?;
        }

        Command::PrmGet { prm_file, key } => {
            let prm = PrmFile::read(&prm_file)?;
            println!("{}", prm.require(&key)?);
        }

        Command::PrmSet { prm_file, key, value } => {
            update_prm(&prm_file, &key, &value)?;
        }

        Command::Baselines {
            reference_date,
            workdir,
        } => {
            let scene_dir = baselines::scene_directory(&workdir);
            let runner = ExternalTools::new(&scene_dir);
            baselines::compute_baselines(
                &runner,
                &scene_dir,
                &reference_date,
                &workdir.join(BASELINE_TABLE_FILE),
            )?;
        }

        Command::SelectPairs {
            infile,
            month_min,
            month_max,
            method,
            bcrit,
            tcrit,
            dmax,
            filtered_short_gaps,
            span,
            output_dir,
            no_plot,
        } => {
            let select = &mut config.select;
            if let Some(v) = month_min {
                select.month_min = v;
            }
            if let Some(v) = month_max {
                select.month_max = v;
            }
            if let Some(v) = method {
                select.method = v;
            }
            if let Some(v) = bcrit {
                select.bcrit = v;
            }
            if let Some(v) = tcrit {
                select.tcrit = v;
            }
            if let Some(v) = dmax {
                select.dmax = v;
            }
            if filtered_short_gaps {
                select.short_gap_source = ShortGapSource::Filtered;
            }
            if let Some(date) = span {
                select.event = Some(parse_event_date(&date)?);
            }
            log::debug!("{:?}", config.select);

            let scenes = BaselineTable::read(&infile)
                .with_context(|| format!("Reading baseline table {}", infile.display()))?;
            let network = pair_selection::select_pairs(&scenes, &config.select)?;
            pair_selection::write_selection(&network, &config.tops, &output_dir)?;
            if !no_plot {
                network_plot::plot_network(&network, &project_name(&output_dir), &output_dir)?;
            }
        }

        Command::PrepareTops { swath, workdir } => {
            let slc_dir = workdir.join(baselines::SLC_DIR);
            std::fs::create_dir_all(&slc_dir)?;
            let runner = ExternalTools::new(&slc_dir);
            let orbits = OrbitDownloader::new(config.orbits.clone())?;
            let stack = tops_stack::prepare_tops_stack(&workdir, swath, &runner, &orbits)?;
            log::info!("Prepared {} scenes", stack.scenes.len());
        }

        Command::RunJobs { job_file, workers } => {
            let commands = jobs::read_job_file(&job_file)
                .with_context(|| format!("Reading job file {}", job_file.display()))?;
            let summary = jobs::run_jobs(&commands, workers)?;
            if summary.failed > 0 {
                log::warn!("{} of {} jobs failed", summary.failed, summary.submitted);
            }
        }

        Command::PlotBaselines { table, output } => {
            let scenes = BaselineTable::read(&table)?;
            network_plot::plot_baselines(&scenes, &output)?;
        }
    }

    Ok(())
}
