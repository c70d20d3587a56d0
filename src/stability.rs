//! File stability detection.
//!
//! Scanners write slowly and in bursts. A file only counts as ready once
//! its size has held unchanged, and non-zero, for a continuous threshold.

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::error::PipelineError;

/// How long a file's size must hold before it counts as fully written.
pub const STABILITY_THRESHOLD: Duration = Duration::from_secs(10);

/// Interval between size samples.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on the whole wait.
pub const MAX_WAIT: Duration = Duration::from_secs(5 * 60);

/// Watches a file's size until it stops changing.
#[derive(Debug, Clone)]
pub struct StabilityDetector {
    pub poll_interval: Duration,
    pub stability_threshold: Duration,
    pub max_wait: Duration,
}

impl Default for StabilityDetector {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            stability_threshold: STABILITY_THRESHOLD,
            max_wait: MAX_WAIT,
        }
    }
}

impl StabilityDetector {
    /// Create a detector with custom timings.
    pub fn with_timings(
        poll_interval: Duration,
        stability_threshold: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            poll_interval,
            stability_threshold,
            max_wait,
        }
    }

    /// Wait until `path` has held a non-zero size for the stability
    /// threshold, returning the settled size.
    ///
    /// Any size deviation resets the clock, which handles both slow
    /// multi-second writes and scanners that write in bursts. A file stuck
    /// at size zero never reports stable and runs into the max wait.
    pub async fn wait_for_stable(&self, path: &Path) -> Result<u64, PipelineError> {
        let started = Instant::now();
        let mut last_size: Option<u64> = None;
        let mut held_since = Instant::now();

        loop {
            let size = match tokio::fs::metadata(path).await {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(PipelineError::SourceVanished(path.to_path_buf()));
                }
                Err(e) => return Err(e.into()),
            };

            if last_size != Some(size) {
                last_size = Some(size);
                held_since = Instant::now();
            } else if size > 0 && held_since.elapsed() >= self.stability_threshold {
                return Ok(size);
            }

            if started.elapsed() >= self.max_wait {
                return Err(PipelineError::StabilityTimeout {
                    path: path.to_path_buf(),
                    max_wait: self.max_wait,
                });
            }

            sleep(self.poll_interval).await;
        }
    }
}
