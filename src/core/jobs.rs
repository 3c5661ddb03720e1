//! Fixed-size worker pool for shell command lists such as `run_p2pTOPS`.
//!
//! Commands are handed to the workers through a bounded channel of depth
//! one, so the producer only gets ahead of the workers by a single job.
//! Dropping the sender after the last job is the shutdown signal: workers
//! drain the channel and exit, and the scope joins them.

use crate::types::{SarError, SarResult};
use crossbeam_channel::bounded;
use crossbeam_utils::atomic::AtomicCell;
use std::path::Path;
use std::process::Command;
use std::thread;

/// Outcome counts of a job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Command lines of a job file, blank lines skipped
pub fn read_job_file<P: AsRef<Path>>(path: P) -> SarResult<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    Ok(parse_job_lines(&content))
}

pub fn parse_job_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Run `commands` through `sh -c` on `workers` threads.
///
/// A failing command is logged and counted; it never stops the queue.
pub fn run_jobs(commands: &[String], workers: usize) -> SarResult<JobSummary> {
    if workers == 0 {
        return Err(SarError::Config("At least one worker is required".to_string()));
    }

    let succeeded = AtomicCell::new(0usize);
    let failed = AtomicCell::new(0usize);
    let (tx_job, rx_job) = bounded::<&str>(1);

    log::info!("Running {} jobs on {} workers", commands.len(), workers);

    thread::scope(|scope| -> SarResult<()> {
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx_job = rx_job.clone();
            let succeeded = &succeeded;
            let failed = &failed;
            let handle = thread::Builder::new()
                .name(format!("job-worker-{}", worker))
                .spawn_scoped(scope, move || {
                    for command in rx_job.iter() {
                        if run_command(worker, command) {
                            succeeded.fetch_add(1);
                        } else {
                            failed.fetch_add(1);
                        }
                    }
                })?;
            handles.push(handle);
        }
        drop(rx_job);

        for command in commands {
            if tx_job.send(command.as_str()).is_err() {
                // Every worker has gone away
                break;
            }
        }
        drop(tx_job);

        for handle in handles {
            handle
                .join()
                .map_err(|_| SarError::Processing("A job worker panicked".to_string()))?;
        }
        Ok(())
    })?;

    let summary = JobSummary {
        submitted: commands.len(),
        succeeded: succeeded.load(),
        failed: failed.load(),
    };
    log::info!(
        "{} jobs finished, {} failed",
        summary.succeeded + summary.failed,
        summary.failed
    );
    Ok(summary)
}

fn run_command(worker: usize, command: &str) -> bool {
    log::debug!("[worker {}] {}", worker, command);
    match Command::new("sh").arg("-c").arg(command).status() {
        Ok(status) if status.success() => true,
        Ok(status) => {
            log::warn!("Job '{}' exited with {}", command, status);
            false
        }
        Err(e) => {
            log::warn!("Job '{}' could not be started: {}", command, e);
            false
        }
    }
}
