//! gmtsar-stack: stack preparation and SBAS pair selection for GMTSAR
//!
//! This library drives the GMTSAR InSAR tools over a stack of scenes:
//! extracting ALOS state vectors, computing perpendicular baselines against a
//! reference scene, selecting an interferogram network from a Delaunay
//! triangulation of the baseline plane, preparing Sentinel-1 TOPS scenes,
//! and running the resulting per-pair commands on a worker pool.

pub mod config;
pub mod core;
pub mod io;
pub mod tools;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{Pair, PassDirection, SarError, SarResult, Scene, SubswathMetadata};

pub use config::{OrbitConfig, SelectionConfig, SelectionMethod, StackConfig, TopsProcessingConfig};
pub use io::{AnnotationParser, BaselineTable, LeaderReader, OrbitDownloader, OrbitSource, PrmFile, SlcReader};
pub use tools::{invoke_key_values, ExternalTools, ToolRunner};
