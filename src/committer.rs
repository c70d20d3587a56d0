//! Destination filing and archival.
//!
//! Writes each extracted record to its category folder, then archives the
//! original. Copy first, move second: a crash between the two leaves the
//! source untouched in the watch folder, never lost.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::PipelineError;
use crate::record::{Category, ExtractedRecord};

/// Literal suffix appended after the amount in generated filenames.
const CURRENCY_MARKER: &str = "円";

/// Subdirectory under the destination root that archives source files.
const ORIGINALS_DIR: &str = "originals";

/// Files extracted records into a destination tree.
#[derive(Debug, Clone)]
pub struct Committer {
    dest_root: PathBuf,
}

/// What happened to one source file's records.
#[derive(Debug)]
pub struct CommitSummary {
    /// Destination paths successfully written.
    pub committed: Vec<PathBuf>,

    /// Records whose copy failed.
    pub failed: usize,

    /// Where the original ended up, if it was archived.
    pub archived_to: Option<PathBuf>,
}

impl Committer {
    pub fn new(dest_root: impl Into<PathBuf>) -> Self {
        Self {
            dest_root: dest_root.into(),
        }
    }

    /// Commit every record extracted from `source`, then archive the
    /// original if at least one record landed.
    ///
    /// Record copies are independent: a failure is logged and does not
    /// block sibling records. With zero successes the source stays where
    /// it is and no archive step runs, so a later watcher event can retry
    /// the whole file.
    pub fn commit(
        &self,
        source: &Path,
        records: &[ExtractedRecord],
    ) -> Result<CommitSummary, PipelineError> {
        let mut summary = CommitSummary {
            committed: Vec::new(),
            failed: 0,
            archived_to: None,
        };

        for record in records {
            match self.commit_record(source, record) {
                Ok(dest) => {
                    tracing::info!("[Committer] Filed {}", dest.display());
                    summary.committed.push(dest);
                }
                Err(e) => {
                    tracing::warn!(
                        "[Committer] Failed to file record from {}: {}",
                        source.display(),
                        e
                    );
                    summary.failed += 1;
                }
            }
        }

        if summary.committed.is_empty() {
            tracing::warn!(
                "[Committer] No records committed for {}; leaving source in place",
                source.display()
            );
            return Ok(summary);
        }

        let archived = self.archive_original(source)?;
        tracing::info!("[Committer] Archived original to {}", archived.display());
        summary.archived_to = Some(archived);

        Ok(summary)
    }

    /// Copy the source bytes to one record's destination path.
    fn commit_record(
        &self,
        source: &Path,
        record: &ExtractedRecord,
    ) -> Result<PathBuf, PipelineError> {
        let category = Category::from_str(&record.category);
        let dir = self.dest_root.join(category.as_str());
        fs::create_dir_all(&dir)?;

        let dest = dir.join(destination_file_name(record, source));
        fs::copy(source, &dest)?;
        Ok(dest)
    }

    /// Move the source into the originals archive.
    fn archive_original(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        let originals = self.dest_root.join(ORIGINALS_DIR);
        fs::create_dir_all(&originals)?;

        let name = source
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "unknown".into());
        let dest = originals.join(name);

        move_file(source, &dest)?;
        Ok(dest)
    }
}

/// Build `<date>_<vendor>_<amount><marker><ext>` for a record.
///
/// An empty date defaults to today; the source extension is preserved.
fn destination_file_name(record: &ExtractedRecord, source: &Path) -> String {
    let date = if record.date.trim().is_empty() {
        Local::now().format("%Y-%m-%d").to_string()
    } else {
        record.date.trim().to_string()
    };

    let vendor = normalize_vendor(&record.vendor);
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    format!(
        "{}_{}_{}{}{}",
        date, vendor, record.amount, CURRENCY_MARKER, ext
    )
}

/// Strip whitespace and replace path-separator characters so the vendor
/// can sit inside a filename.
fn normalize_vendor(vendor: &str) -> String {
    vendor
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '/' | '\\' => '-',
            c => c,
        })
        .collect()
}

/// Rename `src` to `dst`, falling back to copy-then-delete when the two
/// live on different filesystems. Any other rename failure is surfaced
/// as-is and the source is left in place.
fn move_file(src: &Path, dst: &Path) -> Result<(), PipelineError> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => copy_then_delete(src, dst),
        Err(e) => Err(e.into()),
    }
}

/// Cross-device fallback body: copy the bytes over, then remove the source.
fn copy_then_delete(src: &Path, dst: &Path) -> Result<(), PipelineError> {
    fs::copy(src, dst)?;
    fs::remove_file(src)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(date: &str, vendor: &str, category: &str, amount: u64) -> ExtractedRecord {
        ExtractedRecord {
            date: date.to_string(),
            vendor: vendor.to_string(),
            category: category.to_string(),
            amount,
        }
    }

    fn setup() -> (TempDir, PathBuf, Committer) {
        let tmp = TempDir::new().unwrap();
        let watch = tmp.path().join("watch");
        let dest = tmp.path().join("dest");
        fs::create_dir_all(&watch).unwrap();

        let source = watch.join("scan001.pdf");
        fs::write(&source, b"%PDF-1.4 fake scan").unwrap();

        (tmp, source, Committer::new(dest))
    }

    #[test]
    fn test_single_record_commits_and_archives() {
        let (tmp, source, committer) = setup();
        let records = vec![record("2024-01-05", "ACME", "Grocery", 1200)];

        let summary = committer.commit(&source, &records).unwrap();

        let dest = tmp
            .path()
            .join("dest/Grocery/2024-01-05_ACME_1200円.pdf");
        assert_eq!(summary.committed, vec![dest.clone()]);
        assert!(dest.exists());

        // Original moved into the archive under its own basename.
        assert!(!source.exists());
        let archived = tmp.path().join("dest/originals/scan001.pdf");
        assert!(archived.exists());
        assert_eq!(summary.archived_to, Some(archived));
    }

    #[test]
    fn test_zero_records_leaves_source_untouched() {
        let (tmp, source, committer) = setup();

        let summary = committer.commit(&source, &[]).unwrap();

        assert!(summary.committed.is_empty());
        assert!(summary.archived_to.is_none());
        assert!(source.exists());
        assert!(!tmp.path().join("dest/originals/scan001.pdf").exists());
    }

    #[test]
    fn test_multiple_records_file_independently() {
        let (tmp, source, committer) = setup();
        let records = vec![
            record("2024-01-05", "Clinic", "Medical", 5000),
            record("2024-01-05", "Market", "Grocery", 800),
        ];

        let summary = committer.commit(&source, &records).unwrap();

        assert_eq!(summary.committed.len(), 2);
        assert_eq!(summary.failed, 0);
        assert!(tmp
            .path()
            .join("dest/Medical/2024-01-05_Clinic_5000円.pdf")
            .exists());
        assert!(tmp
            .path()
            .join("dest/Grocery/2024-01-05_Market_800円.pdf")
            .exists());
        // One source, one archive entry.
        assert!(tmp.path().join("dest/originals/scan001.pdf").exists());
    }

    #[test]
    fn test_unrecognized_category_files_as_unsorted() {
        let (tmp, source, committer) = setup();
        let records = vec![record("2024-02-01", "Mystery", "snacks", 1)];

        committer.commit(&source, &records).unwrap();

        assert!(tmp
            .path()
            .join("dest/Unsorted/2024-02-01_Mystery_1円.pdf")
            .exists());
    }

    #[test]
    fn test_vendor_normalization() {
        assert_eq!(normalize_vendor("A B"), "AB");
        assert_eq!(normalize_vendor("A/B"), "A-B");
        assert_eq!(normalize_vendor("A\\B"), "A-B");
        assert_eq!(normalize_vendor(" Acme  Corp "), "AcmeCorp");
    }

    #[test]
    fn test_destination_file_name_defaults_empty_date_to_today() {
        let name = destination_file_name(
            &record("", "ACME", "Grocery", 42),
            Path::new("/watch/scan.jpg"),
        );

        let today = Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(name, format!("{}_ACME_42円.jpg", today));
    }

    #[test]
    fn test_destination_file_name_preserves_extension_case() {
        let name = destination_file_name(
            &record("2024-03-03", "ACME", "Tax", 7),
            Path::new("/watch/SCAN.JPG"),
        );
        assert_eq!(name, "2024-03-03_ACME_7円.JPG");
    }

    #[test]
    fn test_copy_then_delete_moves_bytes_across() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        fs::write(&src, b"payload bytes").unwrap();

        copy_then_delete(&src, &dst).unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"payload bytes");
    }

    #[test]
    fn test_move_file_renames_within_filesystem() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.bin");
        let dst = tmp.path().join("dst.bin");
        fs::write(&src, b"x").unwrap();

        move_file(&src, &dst).unwrap();

        assert!(!src.exists());
        assert!(dst.exists());
    }
}
