use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use super::{FetchedObject, ObjectStorage};

/// Directory-backed storage: object `bucket/key` lives at `<root>/<bucket>/<key>`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject> {
        let path = self.object_path(bucket, key);
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        Ok(FetchedObject {
            content_length: bytes.len() as u64,
            bytes,
        })
    }

    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let dest = self.object_path(bucket, key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::copy(path, &dest)
            .await
            .with_context(|| format!("copying {} -> {}", path.display(), dest.display()))?;
        info!(object = %key, bucket, dest = %dest.display(), "stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_then_get() -> Result<()> {
        let root = TempDir::new()?;
        let storage = LocalStorage::new(root.path());

        let src = root.path().join("scratch.txt");
        fs::write(&src, b"hello").await?;
        storage.upload_file(&src, "bucket", "a/b/c.txt").await?;

        let obj = storage.get_object("bucket", "a/b/c.txt").await?;
        assert_eq!(obj.bytes, b"hello");
        assert_eq!(obj.content_length, 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_object_is_error() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path());
        assert!(storage.get_object("bucket", "nope.csv").await.is_err());
    }
}
