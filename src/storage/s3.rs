use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::{primitives::ByteStream, Client};
use std::path::Path;
use tracing::{debug, info};

use super::{FetchedObject, ObjectStorage};

/// S3 backend using the default AWS credential and region chain.
pub struct S3Storage {
    client: Client,
}

impl S3Storage {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the environment (region, credentials, endpoint).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<FetchedObject> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("GetObject s3://{}/{}", bucket, key))?;

        let reported = resp.content_length();
        let bytes = resp
            .body
            .collect()
            .await
            .with_context(|| format!("reading body of s3://{}/{}", bucket, key))?
            .into_bytes()
            .to_vec();

        let content_length = reported
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(bytes.len() as u64);
        debug!(bucket, key, content_length, "fetched object");

        Ok(FetchedObject {
            bytes,
            content_length,
        })
    }

    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("opening {} for upload", path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| format!("PutObject s3://{}/{}", bucket, key))?;

        info!(object = %key, bucket, "uploaded");
        Ok(())
    }
}
