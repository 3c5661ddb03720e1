//! Stack pipelines: baselines, pair selection, TOPS preparation and the job runner

pub mod baselines;
pub mod delaunay;
pub mod jobs;
pub mod network_plot;
pub mod pair_selection;
pub mod tops_stack;

// Re-export main types
pub use baselines::{compute_baselines, optimal_reference};
pub use delaunay::delaunay_edges;
pub use jobs::{run_jobs, JobSummary};
pub use network_plot::{plot_baselines, plot_network};
pub use pair_selection::{select_pairs, write_selection, PairNetwork};
pub use tops_stack::{prepare_tops_stack, PreparedStack};
