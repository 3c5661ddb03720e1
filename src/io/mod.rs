//! Readers and writers for the files a GMTSAR stack is built from

pub mod annotation;
pub mod baseline_table;
pub mod leader;
pub mod orbit;
pub mod prm;
pub mod slc_reader;

pub use annotation::AnnotationParser;
pub use baseline_table::{BaselineTable, BASELINE_TABLE_FILE};
pub use leader::{extract_led, LeaderOrbit, LeaderReader};
pub use orbit::{OrbitDownloader, OrbitSource, OrbitType};
pub use prm::{parse_key_values, update_prm, PrmFile};
pub use slc_reader::SlcReader;
