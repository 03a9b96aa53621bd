//! Filesystem helpers for writing render output.
//!
//! Renders go to a `.part` sibling of the final path and are moved into place
//! only on success. The move falls back to copy-and-delete when the scratch
//! file lives on another filesystem (EXDEV).

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// In-progress sibling of `output`: `clip.mp4` becomes `clip.part.mp4`.
///
/// The extension is kept so FFmpeg can still infer the container.
pub fn part_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.part.{}", stem, ext.to_string_lossy()),
        None => format!("{}.part", stem),
    };
    output.with_file_name(name)
}

/// Remove a file, ignoring a missing one.
pub async fn remove_if_exists(path: &Path) -> MediaResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Move a file from `src` to `dst`, creating `dst`'s parent and handling
/// cross-device moves.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is error code 18 on Linux/macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

/// Copy next to `dst`, rename into place, then delete `src`.
async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let tmp_dst = dst.with_extension("tmp");

    fs::copy(src, &tmp_dst).await?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = fs::remove_file(&tmp_dst).await;
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("/results/final_shorts.mp4")),
            PathBuf::from("/results/final_shorts.part.mp4")
        );
        assert_eq!(part_path(Path::new("out")), PathBuf::from("out.part"));
    }

    #[tokio::test]
    async fn test_move_file_into_new_subdirectory() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("render.part.mp4");
        let dst = dir.path().join("results").join("final.mp4");

        fs::write(&src, b"frames").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_move_file_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.mp4");
        let dst = dir.path().join("final.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();
        move_file(&src, &dst).await.unwrap();

        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.mp4");
        remove_if_exists(&path).await.unwrap();

        fs::write(&path, b"x").await.unwrap();
        remove_if_exists(&path).await.unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
