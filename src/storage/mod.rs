// src/storage/mod.rs

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod local;
pub mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;

/// Body and reported length of a fetched object.
#[derive(Debug, Clone)]
pub struct FetchedObject {
    pub bytes: Vec<u8>,
    pub content_length: u64,
}

/// The two storage operations the transform needs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject>;

    /// Upload the file at `path` to `bucket/key`, replacing any existing object.
    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()>;
}
