//! In-flight path registry.
//!
//! Guarantees at most one active processing task per file path. A scanner
//! emitting several rapid events for the same file results in sequential,
//! non-overlapping processing attempts: the claim is released only when the
//! owning task's guard drops, and the next matching event starts fresh.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashSet;

/// Concurrent set of paths currently claimed by a processing task.
///
/// Cloning is cheap; all clones share the same underlying set. The watch
/// session owns one of these and hands a clone to every spawned task.
#[derive(Clone, Default)]
pub struct InFlightSet {
    paths: Arc<DashSet<PathBuf>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a path for processing.
    ///
    /// Returns a guard that releases the claim when dropped, or `None` if
    /// another task already holds this path.
    pub fn claim(&self, path: &Path) -> Option<InFlightGuard> {
        if self.paths.insert(path.to_path_buf()) {
            Some(InFlightGuard {
                set: self.clone(),
                path: path.to_path_buf(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Releases the claimed path when dropped, however the owning task ends.
pub struct InFlightGuard {
    set: InFlightSet,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.paths.remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_blocks_duplicate() {
        let set = InFlightSet::new();
        let path = Path::new("/watch/scan.pdf");

        let guard = set.claim(path);
        assert!(guard.is_some());
        assert!(set.claim(path).is_none());
        assert!(set.contains(path));
    }

    #[test]
    fn test_release_on_drop() {
        let set = InFlightSet::new();
        let path = Path::new("/watch/scan.pdf");

        let guard = set.claim(path).unwrap();
        drop(guard);

        assert!(!set.contains(path));
        assert!(set.claim(path).is_some());
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let set = InFlightSet::new();
        let path = PathBuf::from("/watch/scan.pdf");

        // Threads hand their guard back so claims stay held until counted.
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = set.clone();
                let path = path.clone();
                std::thread::spawn(move || set.claim(&path))
            })
            .collect();

        let guards: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners = guards.iter().filter(|g| g.is_some()).count();
        assert_eq!(winners, 1);
    }
}
