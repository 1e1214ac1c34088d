//! Filesystem helpers for relocating artifacts.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::MediaResult;

/// EXDEV on Linux and macOS.
const EXDEV: i32 = 18;

/// Move `src` to `dst`, creating the destination directory if needed.
///
/// Tries a rename first. When source and destination sit on different
/// filesystems the file is copied next to `dst`, renamed into place, and the
/// source is then removed.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(EXDEV) => {
            debug!(
                src = %src.display(),
                dst = %dst.display(),
                "Rename crosses devices, copying instead"
            );
            copy_across_devices(src, dst).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn copy_across_devices(src: &Path, dst: &Path) -> MediaResult<()> {
    // Stage beside the destination so the final rename stays on one device
    let staged = dst.with_extension("partial");

    if let Err(e) = fs::copy(src, &staged).await {
        remove_quietly(&staged).await;
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&staged, dst).await {
        remove_quietly(&staged).await;
        return Err(e.into());
    }

    remove_quietly(src).await;
    Ok(())
}

/// Remove a file, logging instead of failing.
pub async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

/// Fresh path `<dir>/<uuid><ext>`; `ext` includes the leading dot or is empty.
pub fn unique_path(dir: &Path, ext: &str) -> PathBuf {
    dir.join(format!("{}{}", Uuid::new_v4(), ext))
}

/// Extension of `source` with its leading dot, or `default` when absent.
///
/// Query strings and fragments of URLs are ignored.
pub fn extension_of(source: &str, default: &str) -> String {
    let path_part = source
        .split(['?', '#'])
        .next()
        .unwrap_or(source);
    match Path::new(path_part).extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() && !ext.contains('/') => format!(".{}", ext),
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_same_filesystem() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.mp4");
        let dst = dir.path().join("out").join("final.mp4");
        fs::write(&src, b"frames").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_move_file_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("b.mp4");
        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();
        assert_eq!(fs::read(&dst).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_copy_across_devices_cleans_up() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.mp4");
        let dst = dir.path().join("b.mp4");
        fs::write(&src, b"data").await.unwrap();

        copy_across_devices(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert!(!dst.with_extension("partial").exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let result = move_file(dir.path().join("nope.mp4"), dir.path().join("x.mp4")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_remove_quietly_ignores_missing() {
        let dir = TempDir::new().unwrap();
        remove_quietly(&dir.path().join("missing")).await;
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/media/clip.mov", ".mp4"), ".mov");
        assert_eq!(extension_of("https://cdn.test/v/clip.webm?token=abc", ".mp4"), ".webm");
        assert_eq!(extension_of("https://cdn.test/stream", ".mp4"), ".mp4");
        assert_eq!(extension_of("noext", ""), "");
    }

    #[test]
    fn test_unique_path() {
        let dir = Path::new("/tmp/work");
        let a = unique_path(dir, ".mp4");
        let b = unique_path(dir, ".mp4");
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(dir));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("mp4"));
    }
}
