//! Filesystem-backed object store.
//!
//! Keys map to paths below a root directory, so `packages/<id>` is written to
//! `<root>/packages/<id>`.

use super::{check_key, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

/// Save file content to the specified path, creating parent directories.
async fn save_file(path: &Path, content: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
        debug!(parent = %parent.display(), "Created parent directory");
    }

    fs::write(path, content).await?;
    info!(
        path = %path.display(),
        size = content.len(),
        "File saved successfully"
    );
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put_object(
        &self,
        key: &str,
        body: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.path_for(key)?;
        save_file(&path, &body).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let dir = self.path_for(prefix.trim_end_matches('/'))?;

        tokio::task::spawn_blocking(move || {
            if !dir.exists() {
                return Ok(0);
            }

            let mut deleted = 0;
            for entry in WalkDir::new(&dir).into_iter() {
                let entry = entry.map_err(std::io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => deleted += 1,
                    Err(e) => {
                        warn!(file = %entry.path().display(), error = %e, "Failed to delete file");
                        return Err(StorageError::Io(e));
                    }
                }
            }
            Ok(deleted)
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
    }
}
