//! Per-file processing task.
//!
//! Each eligible watch event runs this end to end inside its own task:
//! filter, settle, analyze, parse, file. Failures abort the task and leave
//! the source in the watch folder, so a future event can retry it.

use std::path::Path;

use crate::analysis::{self, GeminiClient};
use crate::committer::Committer;
use crate::error::PipelineError;
use crate::stability::StabilityDetector;

/// Shared collaborators handed (behind `Arc`) to every spawned file task.
pub struct Pipeline {
    client: GeminiClient,
    committer: Committer,
    stability: StabilityDetector,
}

impl Pipeline {
    pub fn new(client: GeminiClient, committer: Committer) -> Self {
        Self {
            client,
            committer,
            stability: StabilityDetector::default(),
        }
    }

    /// Replace the default stability timings.
    pub fn with_stability(mut self, stability: StabilityDetector) -> Self {
        self.stability = stability;
        self
    }

    /// Process one file from settle to archive.
    ///
    /// Non-target extensions return quietly; they are simply not documents
    /// for this pipeline.
    pub async fn process(&self, path: &Path) -> Result<(), PipelineError> {
        if !analysis::is_target_document(path) {
            return Ok(());
        }

        let size = self.stability.wait_for_stable(path).await?;
        tracing::info!("[Pipeline] Processing {} ({} bytes)", path.display(), size);

        let raw = self.client.extract(path).await?;
        let records = analysis::parse_records(&raw)?;

        if records.is_empty() {
            tracing::info!("[Pipeline] Model found no records in {}", path.display());
            return Ok(());
        }

        let summary = self.committer.commit(path, &records)?;
        tracing::info!(
            "[Pipeline] {}: {} filed, {} failed",
            path.display(),
            summary.committed.len(),
            summary.failed
        );

        Ok(())
    }
}
