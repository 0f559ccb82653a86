//! Bounded wait for files produced by an upstream stage

use crate::errors::{ChurnError, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Fixed-interval polling with an overall deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(90),
            interval: Duration::from_secs(1),
        }
    }
}

impl WaitPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Block until `path` exists or the policy's timeout elapses
pub fn wait_for_file(path: &Path, policy: &WaitPolicy) -> Result<()> {
    let start = Instant::now();
    loop {
        if path.exists() {
            debug!("Upstream file {} present after {:?}", path.display(), start.elapsed());
            return Ok(());
        }

        let waited = start.elapsed();
        if waited >= policy.timeout {
            return Err(ChurnError::UpstreamNotReady {
                path: path.to_path_buf(),
                waited,
            });
        }

        let remaining = policy.timeout - waited;
        std::thread::sleep(policy.interval.min(remaining));
    }
}

/// Wait for every path in turn, sharing one deadline
pub fn wait_for_all<P: AsRef<Path>>(paths: &[P], policy: &WaitPolicy) -> Result<()> {
    let start = Instant::now();
    for path in paths {
        let remaining = policy.timeout.saturating_sub(start.elapsed());
        wait_for_file(path.as_ref(), &WaitPolicy::new(remaining, policy.interval)).map_err(
            |err| match err {
                ChurnError::UpstreamNotReady { path, .. } => ChurnError::UpstreamNotReady {
                    path,
                    waited: start.elapsed(),
                },
                other => other,
            },
        )?;
    }
    info!(
        "All {} upstream files ready: {:?}",
        paths.len(),
        paths.iter().map(|p| p.as_ref().to_path_buf()).collect::<Vec<PathBuf>>()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick() -> WaitPolicy {
        WaitPolicy::new(Duration::from_millis(60), Duration::from_millis(10))
    }

    #[test]
    fn test_present_file_returns_immediately() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("X.json");
        std::fs::write(&path, "[]")?;
        wait_for_file(&path, &quick())?;
        Ok(())
    }

    #[test]
    fn test_absent_file_times_out() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("never.json");
        match wait_for_file(&path, &quick()) {
            Err(ChurnError::UpstreamNotReady { path: p, waited }) => {
                assert_eq!(p, path);
                assert!(waited >= Duration::from_millis(60));
            }
            other => panic!("expected upstream timeout, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_file_appearing_later_is_picked_up() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("y.json");
        let writer_path = path.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            std::fs::write(writer_path, "[]")
        });

        let policy = WaitPolicy::new(Duration::from_secs(5), Duration::from_millis(5));
        wait_for_all(&[path.as_path()], &policy)?;
        writer.join().expect("writer thread")?;
        Ok(())
    }
}
