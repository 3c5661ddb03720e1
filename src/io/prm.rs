//! GMTSAR parameter (`.PRM`) files and `key = value` tool output

use crate::types::{SarError, SarResult};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Parse `key = value` lines into a map.
///
/// Lines starting with `%` or `#`, and lines without `=`, are ignored. Keys and
/// values are trimmed; only the text between the first and second `=` forms
/// the value. A repeated key keeps its last value.
pub fn parse_key_values(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in text.lines() {
        if line.starts_with('%') || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split('=');
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        values.insert(key.trim().to_string(), value.trim().to_string());
    }
    values
}

/// Format a parameter line the way GMTSAR writes them
pub fn format_prm_line(key: &str, value: &str) -> String {
    format!("{:<23} = {}\n", key, value)
}

/// Contents of a parameter file
#[derive(Debug, Clone)]
pub struct PrmFile {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl PrmFile {
    /// Read and parse a parameter file
    pub fn read<P: AsRef<Path>>(path: P) -> SarResult<Self> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Reading PRM: {}", path.display());
        let content = fs::read_to_string(&path)?;
        Ok(Self {
            values: parse_key_values(&content),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value of a required key
    pub fn require(&self, key: &str) -> SarResult<&str> {
        self.get(key).ok_or_else(|| SarError::MissingKey {
            key: key.to_string(),
            origin: self.path.display().to_string(),
        })
    }

    /// Value of a required key parsed as a float
    pub fn require_f64(&self, key: &str) -> SarResult<f64> {
        let value = self.require(key)?;
        value.parse().map_err(|e| {
            SarError::InvalidFormat(format!(
                "{}: '{}' is not a number ({}) in {}",
                key, value, e, self.path.display()
            ))
        })
    }

    pub fn values(&self) -> &HashMap<String, String> {
        &self.values
    }
}

/// Set `key` to `value` in the parameter file at `path`.
///
/// `key` is a regular expression matched against the start of each line's
/// trimmed key; the first matching line is replaced by a formatted
/// `key = value` line. Without a match the line is appended.
pub fn update_prm<P: AsRef<Path>>(path: P, key: &str, value: &str) -> SarResult<()> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let updated = update_prm_text(&content, key, value)?;
    fs::write(path, updated)?;
    log::debug!("Set {} = {} in {}", key, value, path.display());
    Ok(())
}

/// In-memory form of [`update_prm`]
pub fn update_prm_text(content: &str, key: &str, value: &str) -> SarResult<String> {
    let pattern = Regex::new(&format!("^(?:{})", key))?;
    let mut output = String::with_capacity(content.len() + 32);
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let line_key = line.split('=').next().unwrap_or("").trim();
        if !replaced && pattern.is_match(line_key) {
            output.push_str(&format_prm_line(key, value));
            replaced = true;
        } else {
            output.push_str(line);
        }
    }

    if !replaced {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&format_prm_line(key, value));
    }
    Ok(output)
}

/// Append raw lines (e.g. a tool log) to a parameter file
pub fn append_to_prm<P: AsRef<Path>>(path: P, text: &str) -> SarResult<()> {
    let mut file = fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}
