use crate::types::{parse_scene_date, SarError, SarResult, Scene};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default name of the baseline table
pub const BASELINE_TABLE_FILE: &str = "bl_list.txt";

/// Reader/writer for `bl_list.txt`:
/// `date perpendicular_baseline parallel_baseline product` per line
pub struct BaselineTable;

impl BaselineTable {
    /// Read all scenes of a baseline table, in file order
    pub fn read<P: AsRef<Path>>(path: P) -> SarResult<Vec<Scene>> {
        let path = path.as_ref();
        log::debug!("Reading baseline table: {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse baseline table text; blank lines are skipped
    pub fn parse(content: &str) -> SarResult<Vec<Scene>> {
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| Self::parse_line(line, i + 1))
            .collect()
    }

    fn parse_line(line: &str, line_number: usize) -> SarResult<Scene> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(SarError::InvalidFormat(format!(
                "Baseline table line {}: expected 4 columns, found {}",
                line_number,
                fields.len()
            )));
        }
        let parse_baseline = |text: &str, name: &str| -> SarResult<f64> {
            text.parse().map_err(|e| {
                SarError::InvalidFormat(format!(
                    "Baseline table line {}: invalid {} '{}': {}",
                    line_number, name, text, e
                ))
            })
        };

        Ok(Scene {
            label: fields[0].to_string(),
            date: parse_scene_date(fields[0])?,
            perpendicular_baseline: parse_baseline(fields[1], "perpendicular baseline")?,
            parallel_baseline: parse_baseline(fields[2], "parallel baseline")?,
            product: PathBuf::from(fields[3]),
        })
    }

    /// Format one table row
    pub fn format_line(label: &str, bperp: f64, bpar: f64, product: &Path) -> String {
        format!("{} {:.6} {:.6} {}\n", label, bperp, bpar, product.display())
    }

    /// Write scenes as a baseline table
    pub fn write<P: AsRef<Path>>(path: P, scenes: &[Scene]) -> SarResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        for scene in scenes {
            writer.write_all(
                Self::format_line(
                    &scene.label,
                    scene.perpendicular_baseline,
                    scene.parallel_baseline,
                    &scene.product,
                )
                .as_bytes(),
            )?;
        }
        writer.flush()?;
        log::info!("Wrote {} scenes to {}", scenes.len(), path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let text = "20160501 0.000000 0.000000 IW1_20160501.SLC\n\n20160513 -41.250000 12.5 IW1_20160513.SLC\n";
        let scenes = BaselineTable::parse(text).unwrap();
        assert_eq!(scenes.len(), 2);
        assert_eq!(scenes[1].label, "20160513");
        assert_eq!(scenes[1].perpendicular_baseline, -41.25);
        assert_eq!(scenes[1].product_stem(), "IW1_20160513");
    }

    #[test]
    fn test_short_line_is_an_error() {
        assert!(BaselineTable::parse("20160501 0.0 0.0\n").is_err());
    }

    #[test]
    fn test_format_line() {
        let line = BaselineTable::format_line("20160501", -3.5, 1.0, Path::new("x.SLC"));
        assert_eq!(line, "20160501 -3.500000 1.000000 x.SLC\n");
    }
}
