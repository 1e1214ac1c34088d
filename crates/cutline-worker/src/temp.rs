//! Intermediate artifacts of one job run.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use cutline_media::fs_utils::remove_quietly;

/// Paths created by a job run that are not its final output.
///
/// Members are removed once no later stage needs them. Whatever is still
/// tracked when the set is dropped is removed synchronously.
#[derive(Debug, Default)]
pub struct TempArtifactSet {
    paths: Vec<PathBuf>,
}

impl TempArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `path`. Tracking the same path twice is a no-op.
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    /// Stop tracking `path` without touching the file.
    pub fn untrack(&mut self, path: &Path) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    /// Remove `path` from disk and from the set.
    pub async fn release(&mut self, path: &Path) {
        if self.untrack(path) {
            debug!(path = %path.display(), "Releasing temp artifact");
            remove_quietly(path).await;
        }
    }

    /// Release several paths.
    pub async fn release_all(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.release(path).await;
        }
    }

    /// Remove every tracked file.
    pub async fn cleanup_all(&mut self) {
        for path in std::mem::take(&mut self.paths) {
            remove_quietly(&path).await;
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Drop for TempArtifactSet {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed leftover temp artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove temp artifact"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[tokio::test]
    async fn test_release_removes_file_and_entry() {
        let dir = TempDir::new().unwrap();
        let mut set = TempArtifactSet::new();
        let a = set.track(touch(&dir, "a.mp4"));
        let b = set.track(touch(&dir, "b.mp4"));
        set.track(a.clone());
        assert_eq!(set.len(), 2);

        set.release(&a).await;
        assert!(!a.exists());
        assert!(b.exists());
        assert!(!set.contains(&a));
    }

    #[tokio::test]
    async fn test_release_all_keeps_other_members() {
        let dir = TempDir::new().unwrap();
        let mut set = TempArtifactSet::new();
        let done = vec![set.track(touch(&dir, "a.mp4")), set.track(touch(&dir, "b.mp4"))];
        let base = set.track(touch(&dir, "merged.mp4"));

        set.release_all(&done).await;
        assert!(done.iter().all(|p| !p.exists()));
        assert!(base.exists());
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn test_release_ignores_untracked() {
        let dir = TempDir::new().unwrap();
        let keep = touch(&dir, "keep.mp4");
        let mut set = TempArtifactSet::new();
        set.release(&keep).await;
        assert!(keep.exists());
    }

    #[tokio::test]
    async fn test_untrack_keeps_file() {
        let dir = TempDir::new().unwrap();
        let mut set = TempArtifactSet::new();
        let out = set.track(touch(&dir, "out.mp4"));
        assert!(set.untrack(&out));
        set.cleanup_all().await;
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_cleanup_all_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        let mut set = TempArtifactSet::new();
        let present = set.track(touch(&dir, "a.mp4"));
        set.track(dir.path().join("never-written.mp4"));
        set.cleanup_all().await;
        assert!(!present.exists());
        assert!(set.is_empty());
    }

    #[test]
    fn test_drop_removes_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = touch(&dir, "leftover.mp4");
        {
            let mut set = TempArtifactSet::new();
            set.track(path.clone());
        }
        assert!(!path.exists());
    }
}
