//! Invocation of the external GMTSAR programs.
//!
//! GMTSAR tools report their results as `key = value` lines on stdout. The
//! [`ToolRunner`] trait is the seam between the pipelines and those programs,
//! so the pipelines can be driven by a scripted runner in tests.

use crate::io::prm::parse_key_values;
use crate::types::{SarError, SarResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Longest stderr excerpt carried in a tool error
const STDERR_EXCERPT_LEN: usize = 400;

/// Something that can run an external tool and hand back its stdout
pub trait ToolRunner {
    fn run(&self, tool: &str, args: &[String]) -> SarResult<String>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for &T {
    fn run(&self, tool: &str, args: &[String]) -> SarResult<String> {
        (**self).run(tool, args)
    }
}

/// Runs tools as child processes in a fixed working directory
#[derive(Debug, Clone)]
pub struct ExternalTools {
    workdir: PathBuf,
}

impl ExternalTools {
    pub fn new<P: AsRef<Path>>(workdir: P) -> Self {
        Self {
            workdir: workdir.as_ref().to_path_buf(),
        }
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }
}

impl ToolRunner for ExternalTools {
    fn run(&self, tool: &str, args: &[String]) -> SarResult<String> {
        log::info!("{} {}", tool, args.join(" "));

        let output = Command::new(tool)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| SarError::Tool {
                tool: tool.to_string(),
                message: format!("failed to start: {}", e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        log::trace!("{} stdout:\n{}", tool, stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_LEN).collect();
            return Err(SarError::Tool {
                tool: tool.to_string(),
                message: format!("{}: {}", output.status, excerpt),
            });
        }

        Ok(stdout)
    }
}

/// Run `tool` and parse its stdout as `key = value` lines.
///
/// Every key in `required` must be present, otherwise
/// [`SarError::MissingKey`] names the first one missing.
pub fn invoke_key_values<R: ToolRunner + ?Sized>(
    runner: &R,
    tool: &str,
    args: &[String],
    required: &[&str],
) -> SarResult<HashMap<String, String>> {
    let stdout = runner.run(tool, args)?;
    let values = parse_key_values(&stdout);

    if let Some(missing) = required.iter().find(|key| !values.contains_key(**key)) {
        return Err(SarError::MissingKey {
            key: missing.to_string(),
            origin: format!("output of {}", tool),
        });
    }

    Ok(values)
}

/// Parse a float from a tool's key/value output
pub fn value_f64(values: &HashMap<String, String>, key: &str, tool: &str) -> SarResult<f64> {
    let text = values.get(key).ok_or_else(|| SarError::MissingKey {
        key: key.to_string(),
        origin: format!("output of {}", tool),
    })?;
    text.parse().map_err(|e| {
        SarError::InvalidFormat(format!("{} printed {} = '{}': {}", tool, key, text, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    impl ToolRunner for Echo {
        fn run(&self, _tool: &str, _args: &[String]) -> SarResult<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_required_keys() {
        let runner = Echo("B_perpendicular = -12.5\nB_parallel = 3.0\n");
        let values = invoke_key_values(&runner, "SAT_baseline", &[], &["B_perpendicular", "B_parallel"]).unwrap();
        assert_eq!(value_f64(&values, "B_perpendicular", "SAT_baseline").unwrap(), -12.5);

        let err = invoke_key_values(&runner, "SAT_baseline", &[], &["B_offset"]).unwrap_err();
        assert!(matches!(err, SarError::MissingKey { ref key, .. } if key == "B_offset"));
    }

    #[test]
    fn test_non_numeric_value() {
        let values = invoke_key_values(&Echo("B_parallel = n/a\n"), "SAT_baseline", &[], &[]).unwrap();
        assert!(matches!(
            value_f64(&values, "B_parallel", "SAT_baseline"),
            Err(SarError::InvalidFormat(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_external_process() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ExternalTools::new(dir.path());

        let out = tools
            .run("sh", &["-c".to_string(), "echo SC_vel = 7000; pwd".to_string()])
            .unwrap();
        assert!(out.starts_with("SC_vel = 7000"));

        let err = tools.run("sh", &["-c".to_string(), "echo bad >&2; exit 3".to_string()]).unwrap_err();
        match err {
            SarError::Tool { tool, message } => {
                assert_eq!(tool, "sh");
                assert!(message.contains("bad"));
            }
            other => panic!("unexpected error: {}", other),
        }

        assert!(tools.run("no-such-gmtsar-tool", &[]).is_err());
    }
}
