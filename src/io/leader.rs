use crate::types::{SarError, SarResult};
use std::fs::File;
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Byte offset of the platform position data inside an ALOS-1 leader file
pub const STATE_VECTOR_OFFSET: u64 = 4956;
/// Number of state vectors stored in the position record
pub const NUM_STATE_VECTORS: usize = 28;
/// Length of one state vector record
pub const STATE_VECTOR_RECORD_LEN: usize = 132;
/// Width of each floating point field
const FLOAT_FIELD_LEN: usize = 22;
/// Width of each integer field in the header
const INT_FIELD_LEN: usize = 4;
/// Filler between the header and the first state vector
const HEADER_PADDING_LEN: usize = 182;

/// Header of the platform position record
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderHeader {
    pub num_points: i32,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub julian_day: i32,
    pub start_seconds: f64, // seconds of day of the first vector
    pub interval: f64,      // seconds between vectors
}

/// One ephemeris sample: position (m) and velocity (m/s)
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderStateVector {
    pub time_of_day: f64,
    pub position: [f64; 3],
    pub velocity: [f64; 3],
}

/// Parsed platform position record
#[derive(Debug, Clone)]
pub struct LeaderOrbit {
    pub header: LeaderHeader,
    pub state_vectors: Vec<LeaderStateVector>,
}

/// Reader for the state vectors of an ALOS-1 leader (LED) file
pub struct LeaderReader;

impl LeaderReader {
    /// Read the platform position record from a leader file
    pub fn read_file<P: AsRef<Path>>(path: P) -> SarResult<LeaderOrbit> {
        log::info!("Reading leader file: {}", path.as_ref().display());
        let mut file = File::open(&path)?;
        Self::read(&mut file)
    }

    /// Read the platform position record from any seekable source
    pub fn read<R: Read + Seek>(reader: &mut R) -> SarResult<LeaderOrbit> {
        reader.seek(SeekFrom::Start(STATE_VECTOR_OFFSET))?;

        let num_points = Self::read_int(reader, "number of points")?;
        let year = Self::read_int(reader, "year")?;
        let month = Self::read_int(reader, "month")?;
        let day = Self::read_int(reader, "day")?;
        let julian_day = Self::read_int(reader, "julian day")?;
        let start_seconds = Self::read_float(reader, "seconds of day")?;
        let interval = Self::read_float(reader, "interval")?;

        let mut padding = [0u8; HEADER_PADDING_LEN];
        reader.read_exact(&mut padding)?;

        let header = LeaderHeader {
            num_points,
            year,
            month: Self::non_negative(month, "month")?,
            day: Self::non_negative(day, "day")?,
            julian_day,
            start_seconds,
            interval,
        };

        let mut state_vectors = Vec::with_capacity(NUM_STATE_VECTORS);
        let mut record = [0u8; STATE_VECTOR_RECORD_LEN];
        for i in 0..NUM_STATE_VECTORS {
            reader.read_exact(&mut record)?;
            let mut values = [0.0; 6];
            for (k, value) in values.iter_mut().enumerate() {
                let field = &record[k * FLOAT_FIELD_LEN..(k + 1) * FLOAT_FIELD_LEN];
                *value = Self::parse_float(field, "state vector component")?;
            }
            state_vectors.push(LeaderStateVector {
                time_of_day: start_seconds + interval * i as f64,
                position: [values[0], values[1], values[2]],
                velocity: [values[3], values[4], values[5]],
            });
        }

        log::debug!(
            "Leader header: {} points, {}-{:02}-{:02}, start {} s, interval {} s",
            header.num_points, header.year, header.month, header.day,
            header.start_seconds, header.interval
        );

        Ok(LeaderOrbit { header, state_vectors })
    }

    fn read_int<R: Read>(reader: &mut R, name: &str) -> SarResult<i32> {
        let mut buf = [0u8; INT_FIELD_LEN];
        reader.read_exact(&mut buf)?;
        let text = Self::field_text(&buf, name)?;
        text.parse()
            .map_err(|e| SarError::InvalidFormat(format!("Invalid {} '{}': {}", name, text, e)))
    }

    fn read_float<R: Read>(reader: &mut R, name: &str) -> SarResult<f64> {
        let mut buf = [0u8; FLOAT_FIELD_LEN];
        reader.read_exact(&mut buf)?;
        Self::parse_float(&buf, name)
    }

    fn parse_float(bytes: &[u8], name: &str) -> SarResult<f64> {
        let text = Self::field_text(bytes, name)?;
        text.parse()
            .map_err(|e| SarError::InvalidFormat(format!("Invalid {} '{}': {}", name, text, e)))
    }

    fn field_text<'a>(bytes: &'a [u8], name: &str) -> SarResult<&'a str> {
        std::str::from_utf8(bytes)
            .map(str::trim)
            .map_err(|_| SarError::InvalidFormat(format!("Non-ASCII bytes in {} field", name)))
    }

    fn non_negative(value: i32, name: &str) -> SarResult<u32> {
        u32::try_from(value)
            .map_err(|_| SarError::InvalidFormat(format!("Negative {}: {}", name, value)))
    }
}

impl LeaderOrbit {
    /// GMTSAR name of the extracted orbit file, `YYYYMMDD.LED`
    pub fn output_file_name(&self) -> String {
        format!("{}{:02}{:02}.LED", self.header.year, self.header.month, self.header.day)
    }

    /// Write the GMTSAR text orbit: one header line followed by one line per vector
    pub fn write<W: Write>(&self, writer: &mut W) -> SarResult<()> {
        let h = &self.header;
        writeln!(
            writer,
            "{} {} {} {:.6} {:.6}",
            h.num_points, h.year, h.julian_day, h.start_seconds, h.interval
        )?;
        for sv in &self.state_vectors {
            writeln!(
                writer,
                "{} {} {:.6} {:.16} {:.16} {:.16} {:.16} {:.16} {:.16}",
                h.year, h.julian_day, sv.time_of_day,
                sv.position[0], sv.position[1], sv.position[2],
                sv.velocity[0], sv.velocity[1], sv.velocity[2]
            )?;
        }
        Ok(())
    }

    /// Write the orbit into `output_dir` under its date-derived name
    pub fn write_to_dir<P: AsRef<Path>>(&self, output_dir: P) -> SarResult<PathBuf> {
        let path = output_dir.as_ref().join(self.output_file_name());
        log::info!("Writing: {}", path.display());
        let mut writer = BufWriter::new(File::create(&path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(path)
    }
}

/// Extract the state vectors of `leader_file` into a `YYYYMMDD.LED` file in `output_dir`
pub fn extract_led<P: AsRef<Path>, Q: AsRef<Path>>(leader_file: P, output_dir: Q) -> SarResult<PathBuf> {
    let orbit = LeaderReader::read_file(leader_file)?;
    orbit.write_to_dir(output_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn float_field(v: f64) -> String {
        format!("{:>22}", format!("{:.6}", v))
    }

    fn synthetic_leader() -> Vec<u8> {
        let mut bytes = vec![b' '; STATE_VECTOR_OFFSET as usize];
        bytes.extend_from_slice(b"  28");
        bytes.extend_from_slice(b"2007");
        bytes.extend_from_slice(b"   3");
        bytes.extend_from_slice(b"  14");
        bytes.extend_from_slice(b"  73");
        bytes.extend_from_slice(float_field(3600.0).as_bytes());
        bytes.extend_from_slice(float_field(60.0).as_bytes());
        bytes.extend(std::iter::repeat(b' ').take(HEADER_PADDING_LEN));
        for i in 0..NUM_STATE_VECTORS {
            for k in 0..6 {
                bytes.extend_from_slice(float_field((i * 10 + k) as f64).as_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_header_offsets() {
        let orbit = LeaderReader::read(&mut Cursor::new(synthetic_leader())).unwrap();
        assert_eq!(orbit.header.num_points, 28);
        assert_eq!(orbit.header.year, 2007);
        assert_eq!(orbit.header.month, 3);
        assert_eq!(orbit.header.day, 14);
        assert_eq!(orbit.header.julian_day, 73);
        assert_eq!(orbit.state_vectors.len(), NUM_STATE_VECTORS);
        assert_eq!(orbit.state_vectors[2].time_of_day, 3720.0);
        assert_eq!(orbit.state_vectors[27].velocity[2], 275.0);
        assert_eq!(orbit.output_file_name(), "20070314.LED");
    }

    #[test]
    fn test_truncated_leader_fails() {
        let mut bytes = synthetic_leader();
        bytes.truncate(bytes.len() - 10);
        assert!(LeaderReader::read(&mut Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_malformed_field_fails() {
        let mut bytes = synthetic_leader();
        bytes[STATE_VECTOR_OFFSET as usize + 4] = b'X';
        match LeaderReader::read(&mut Cursor::new(bytes)) {
            Err(SarError::InvalidFormat(msg)) => assert!(msg.contains("year")),
            other => panic!("expected format error, got {:?}", other.map(|o| o.header)),
        }
    }
}
