use crate::types::{SarError, SarResult};
use glob::Pattern;
use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Archive member names of one sub-swath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubswathEntries {
    pub annotation: String,
    pub measurement: String,
}

/// Files of one sub-swath on disk after extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSubswath {
    pub annotation: PathBuf,
    pub measurement: PathBuf,
}

/// Reader for zipped Sentinel-1 SLC (SAFE) products
pub struct SlcReader {
    zip_path: PathBuf,
    archive: Option<ZipArchive<File>>,
}

impl SlcReader {
    /// Create a new SLC reader for a Sentinel-1 product
    pub fn new<P: AsRef<Path>>(zip_path: P) -> SarResult<Self> {
        let zip_path = zip_path.as_ref().to_path_buf();

        if !zip_path.exists() {
            return Err(SarError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", zip_path.display()),
            )));
        }

        Ok(Self {
            zip_path,
            archive: None,
        })
    }

    pub fn zip_path(&self) -> &Path {
        &self.zip_path
    }

    /// Open the ZIP archive
    fn open_archive(&mut self) -> SarResult<&mut ZipArchive<File>> {
        if self.archive.is_none() {
            let file = File::open(&self.zip_path)?;
            let archive = ZipArchive::new(file)
                .map_err(|e| SarError::InvalidFormat(format!("Failed to open ZIP: {}", e)))?;
            self.archive = Some(archive);
        }
        self.archive
            .as_mut()
            .ok_or_else(|| SarError::Processing("ZIP archive not open".to_string()))
    }

    /// List all files in the archive
    pub fn list_files(&mut self) -> SarResult<Vec<String>> {
        let archive = self.open_archive()?;
        let mut files = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| {
                SarError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to access file {}: {}", i, e),
                ))
            })?;
            files.push(file.name().to_string());
        }

        Ok(files)
    }

    /// Find the co-polarised (VV, else HH) annotation and measurement of a sub-swath.
    /// `swath_num` is the sub-swath number without the `IW` prefix.
    pub fn find_subswath_entries(&mut self, swath_num: u8) -> SarResult<SubswathEntries> {
        let files = self.list_files()?;

        let mut annotation = None;
        let mut measurement = None;
        for pol in ["vv", "hh"] {
            let annotation_pattern =
                Self::member_pattern(&format!("*annotation/s1?-iw{}-slc-{}*.xml", swath_num, pol))?;
            let measurement_pattern =
                Self::member_pattern(&format!("*measurement/s1?-iw{}-slc-{}*tiff", swath_num, pol))?;

            if annotation.is_none() {
                annotation = files.iter().find(|f| annotation_pattern.matches(f)).cloned();
            }
            if measurement.is_none() {
                measurement = files.iter().find(|f| measurement_pattern.matches(f)).cloned();
            }
        }

        match (annotation, measurement) {
            (Some(annotation), Some(measurement)) => Ok(SubswathEntries {
                annotation,
                measurement,
            }),
            _ => Err(SarError::InvalidFormat(format!(
                "No VV/HH annotation and measurement for IW{} in {}",
                swath_num,
                self.zip_path.display()
            ))),
        }
    }

    /// Extract the annotation XML and measurement TIFF of a sub-swath into
    /// `output_dir`. Files already present there are left untouched.
    pub fn extract_subswath<P: AsRef<Path>>(
        &mut self,
        swath_num: u8,
        output_dir: P,
    ) -> SarResult<ExtractedSubswath> {
        let entries = self.find_subswath_entries(swath_num)?;
        let output_dir = output_dir.as_ref();

        let annotation = self.extract_member(&entries.annotation, output_dir)?;
        let measurement = self.extract_member(&entries.measurement, output_dir)?;

        Ok(ExtractedSubswath {
            annotation,
            measurement,
        })
    }

    /// Copy one archive member into `output_dir` under its base name
    fn extract_member(&mut self, member: &str, output_dir: &Path) -> SarResult<PathBuf> {
        let base_name = Path::new(member)
            .file_name()
            .ok_or_else(|| SarError::InvalidFormat(format!("Invalid archive member: {}", member)))?;
        let target = output_dir.join(base_name);

        if target.exists() {
            log::debug!("Already extracted: {}", target.display());
            return Ok(target);
        }

        log::info!("Extracting {} to {}", member, target.display());
        let archive = self.open_archive()?;
        let mut source = archive.by_name(member).map_err(|e| {
            SarError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to read {}: {}", member, e),
            ))
        })?;
        let mut out = File::create(&target)?;
        std::io::copy(&mut source, &mut out)?;

        Ok(target)
    }

    fn member_pattern(pattern: &str) -> SarResult<Pattern> {
        Pattern::new(pattern)
            .map_err(|e| SarError::Processing(format!("Invalid member pattern '{}': {}", pattern, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_safe(path: &Path, members: &[(String, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in members {
            zip.start_file(name.as_str(), FileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_slc_reader_creation() {
        let result = SlcReader::new("nonexistent.zip");
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_selects_swath_and_polarisation() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("S1A_IW_SLC__1SDV_20160501T012345.zip");
        let safe = "S1A_IW_SLC__1SDV_20160501T012345.SAFE";
        write_safe(
            &zip_path,
            &[
                (format!("{}/annotation/s1a-iw1-slc-vh-20160501-001.xml", safe), "vh"),
                (format!("{}/annotation/s1a-iw1-slc-vv-20160501-004.xml", safe), "vv"),
                (format!("{}/annotation/s1a-iw2-slc-vv-20160501-005.xml", safe), "iw2"),
                (format!("{}/measurement/s1a-iw1-slc-vv-20160501-004.tiff", safe), "tiff"),
                (format!("{}/annotation/calibration/calibration-s1a-iw1-slc-vv.xml", safe), "cal"),
            ],
        );

        let out = dir.path().join("SLC");
        std::fs::create_dir(&out).unwrap();
        let mut reader = SlcReader::new(&zip_path).unwrap();
        let extracted = reader.extract_subswath(1, &out).unwrap();

        assert_eq!(extracted.annotation, out.join("s1a-iw1-slc-vv-20160501-004.xml"));
        assert_eq!(std::fs::read(&extracted.annotation).unwrap(), b"vv");
        assert_eq!(std::fs::read(&extracted.measurement).unwrap(), b"tiff");

        // A second extraction leaves existing files alone
        std::fs::write(&extracted.measurement, b"edited").unwrap();
        reader.extract_subswath(1, &out).unwrap();
        assert_eq!(std::fs::read(&extracted.measurement).unwrap(), b"edited");
    }

    #[test]
    fn test_missing_swath() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("S1B.zip");
        write_safe(&zip_path, &[("x.SAFE/annotation/s1b-iw1-slc-hh-1.xml".to_string(), "hh")]);
        let mut reader = SlcReader::new(&zip_path).unwrap();
        assert!(reader.find_subswath_entries(3).is_err());
        // Annotation without measurement is incomplete
        assert!(reader.find_subswath_entries(1).is_err());
    }
}
