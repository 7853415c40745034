//! Local directory standing in for a remote share

use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use super::{FileHandle, FileSource};
use crate::error::{ClientError, Result};

type SharedFile = Arc<tokio::sync::Mutex<File>>;

/// [`FileSource`] backed by `tokio::fs`, rooted at one directory
#[derive(Debug)]
pub struct LocalFileSource {
    root: PathBuf,
    files: Mutex<HashMap<u64, SharedFile>>,
    next_handle: AtomicU64,
}

impl LocalFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a share path (either separator) onto the root directory
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let normalized = path.replace('\\', "/");
        let relative = Path::new(normalized.trim_start_matches('/'));

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ClientError::PathOutsideShare(path.to_string()));
        }

        Ok(self.root.join(relative))
    }

    fn file(&self, handle: FileHandle) -> Result<SharedFile> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle.0)
            .cloned()
            .ok_or(ClientError::InvalidHandle(handle.0))
    }

    pub fn open_files(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl FileSource for LocalFileSource {
    async fn open(&self, path: &str) -> Result<FileHandle> {
        let resolved = self.resolve(path)?;
        let file = File::open(&resolved).await?;

        let handle = FileHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.0, Arc::new(tokio::sync::Mutex::new(file)));

        debug!(%handle, path = %resolved.display(), "opened file");
        Ok(handle)
    }

    async fn size(&self, handle: FileHandle) -> Result<u64> {
        let file = self.file(handle)?;
        let file = file.lock().await;
        Ok(file.metadata().await?.len())
    }

    async fn read(&self, handle: FileHandle, offset: u64, length: usize) -> Result<Vec<u8>> {
        let file = self.file(handle)?;
        let mut file = file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = vec![0u8; length];
        let mut filled = 0;
        while filled < length {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    async fn close(&self, handle: FileHandle) -> Result<()> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(ClientError::InvalidHandle(handle.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_share() -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("smbcore-local-{:016x}", rand::random::<u64>()));
        std::fs::create_dir_all(dir.join("docs")).unwrap();
        std::fs::write(dir.join("docs/report.txt"), b"0123456789").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_open_size_read_close() {
        let root = temp_share();
        let source = LocalFileSource::new(&root);

        let handle = source.open("\\docs\\report.txt").await.unwrap();
        assert_eq!(source.size(handle).await.unwrap(), 10);
        assert_eq!(source.read(handle, 2, 3).await.unwrap(), b"234");
        // short read at end of file
        assert_eq!(source.read(handle, 8, 100).await.unwrap(), b"89");
        assert!(source.read(handle, 50, 4).await.unwrap().is_empty());

        source.close(handle).await.unwrap();
        assert_eq!(source.open_files(), 0);
        assert!(matches!(
            source.read(handle, 0, 1).await,
            Err(ClientError::InvalidHandle(_))
        ));
        assert!(source.close(handle).await.is_err());

        std::fs::remove_dir_all(root).unwrap();
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_root() {
        let root = temp_share();
        let source = LocalFileSource::new(&root);

        for path in ["../etc/passwd", "docs/../../x", "docs\\..\\..\\x"] {
            assert!(matches!(
                source.open(path).await,
                Err(ClientError::PathOutsideShare(_))
            ));
        }
        assert!(matches!(
            source.open("docs/missing.txt").await,
            Err(ClientError::Io(_))
        ));

        std::fs::remove_dir_all(root).unwrap();
    }
}
