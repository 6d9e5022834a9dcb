//! Common utilities for instruction execution
//!
//! Shared file operations used across instruction types. Every mutating
//! operation goes through [`with_busy_retry`].

use crate::install::error::{FileOperation, InstallError, Result};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tracing::debug;
use xxhash_rust::xxh64::Xxh64;

/// Run `op`, retrying exactly once after `delay` if it failed on a busy file
pub async fn with_busy_retry<T, F, Fut>(delay: Duration, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    RetryIf::spawn(
        FixedInterval::new(delay).take(1),
        op,
        |err: &InstallError| {
            let busy = err.is_transient_lock();
            if busy {
                debug!("File busy, retrying once: {}", err);
            }
            busy
        },
    )
    .await
}

/// Join an archive-relative path onto a root, accepting either separator and
/// refusing to climb out of the root
pub fn resolve_relative(root: &Path, relative: &str) -> Result<PathBuf> {
    let normalized = relative.replace('\\', "/");
    let mut resolved = root.to_path_buf();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(InstallError::InvalidInstruction(format!(
                    "path escapes the install directory: {}",
                    relative
                )));
            }
        }
    }
    Ok(resolved)
}

pub async fn ensure_dir(path: &Path, delay: Duration) -> Result<()> {
    with_busy_retry(delay, || async move {
        fs::create_dir_all(path)
            .await
            .map_err(|e| InstallError::fs(path, FileOperation::CreateDir, e))
    })
    .await
}

/// Ensure parent directory exists for a file path
pub async fn ensure_parent_dir(path: &Path, delay: Duration) -> Result<()> {
    match path.parent() {
        Some(parent) if parent != Path::new("") => ensure_dir(parent, delay).await,
        _ => Ok(()),
    }
}

pub async fn write_file(path: &Path, data: &[u8], delay: Duration) -> Result<()> {
    ensure_parent_dir(path, delay).await?;
    with_busy_retry(delay, || async move {
        fs::write(path, data)
            .await
            .map_err(|e| InstallError::fs(path, FileOperation::Write, e))
    })
    .await
}

/// Copy or move one file, creating the destination's parent first
pub async fn transfer_file(source: &Path, destination: &Path, move_file: bool, delay: Duration) -> Result<()> {
    ensure_parent_dir(destination, delay).await?;
    with_busy_retry(delay, || async move {
        if move_file {
            move_or_copy(source, destination).await
        } else {
            fs::copy(source, destination)
                .await
                .map(|_| ())
                .map_err(|e| InstallError::fs(source, FileOperation::Copy, e))
        }
    })
    .await
}

async fn move_or_copy(source: &Path, destination: &Path) -> Result<()> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(InstallError::fs(source, FileOperation::Move, e))
        }
        Err(e) if crate::install::error::is_busy(&e) => {
            Err(InstallError::fs(source, FileOperation::Move, e))
        }
        Err(e) => {
            // rename can't cross filesystems
            debug!("rename of {} failed ({}), copying instead", source.display(), e);
            fs::copy(source, destination)
                .await
                .map_err(|e| InstallError::fs(source, FileOperation::Copy, e))?;
            fs::remove_file(source)
                .await
                .map_err(|e| InstallError::fs(source, FileOperation::Delete, e))
        }
    }
}

/// Remove a directory tree; a missing directory is not an error
pub async fn remove_dir_if_exists(path: &Path, delay: Duration) -> Result<()> {
    with_busy_retry(delay, || async move {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InstallError::fs(path, FileOperation::Delete, e)),
        }
    })
    .await
}

/// xxHash64 of a file as lowercase hex, for correlating error reports
pub async fn compute_file_checksum(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| InstallError::fs(path, FileOperation::Read, e))?;
    let mut hasher = Xxh64::new(0);

    const BUFFER_SIZE: usize = 64 * 1024;
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .await
            .map_err(|e| InstallError::fs(path, FileOperation::Read, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.digest().to_be_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_busy_error_is_retried_exactly_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<()> = with_busy_retry(Duration::from_millis(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(InstallError::fs(
                    "locked.esp",
                    FileOperation::Move,
                    std::io::Error::from(std::io::ErrorKind::ResourceBusy),
                ))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_busy_error_recovers_on_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result = with_busy_retry(Duration::from_millis(1), move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(InstallError::fs(
                        "locked.esp",
                        FileOperation::Copy,
                        std::io::Error::from(std::io::ErrorKind::ResourceBusy),
                    ))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<()> = with_busy_retry(Duration::from_millis(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(InstallError::EmptyInstructions)
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_relative_normalizes_separators() {
        let root = Path::new("/mods/a");
        assert_eq!(
            resolve_relative(root, "data\\textures\\sky.dds").unwrap(),
            PathBuf::from("/mods/a/data/textures/sky.dds")
        );
        assert_eq!(resolve_relative(root, "./readme.txt").unwrap(), PathBuf::from("/mods/a/readme.txt"));
        assert!(resolve_relative(root, "../outside.txt").is_err());
    }

    #[tokio::test]
    async fn test_checksum_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("archive.7z");
        tokio::fs::write(&path, b"Hello, World!").await.unwrap();

        let first = compute_file_checksum(&path).await.unwrap();
        let second = compute_file_checksum(&path).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 16);
        assert_eq!(first, format!("{:016x}", xxhash_rust::xxh64::xxh64(b"Hello, World!", 0)));
    }
}
