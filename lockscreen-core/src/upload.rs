//! Publishing the rendered image.
//!
//! The run overwrites a single well-known key; there is no versioning and
//! no retry. A failed put fails the run.

use std::path::PathBuf;

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;

use crate::config::AwsConfig;
use crate::error::{LockscreenError, LockscreenResult};

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Destination for the rendered image.
#[allow(async_fn_in_trait)]
pub trait ObjectStore {
    /// Write `bytes` to `key`, replacing whatever is there.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> LockscreenResult<()>;

    /// Where a reader finds the object stored under `key`.
    fn url_for(&self, key: &str) -> String;
}

/// S3 bucket from the `[aws]` config section.
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_read: bool,
    cache_control: String,
}

impl S3Store {
    /// Build a client for the configured region. Explicit keys from the
    /// config win over the SDK's default credential chain.
    pub async fn from_config(aws: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(aws.region.clone()));

        if let Some((key_id, secret)) = aws.static_credentials() {
            tracing::debug!("Using S3 credentials from config");
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "lockscreen-config",
            ));
        }

        let sdk_config = loader.load().await;

        S3Store {
            client: aws_sdk_s3::Client::new(&sdk_config),
            bucket: aws.bucket_name.clone(),
            public_read: aws.public_read,
            cache_control: aws.cache_control.clone(),
        }
    }
}

impl ObjectStore for S3Store {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> LockscreenResult<()> {
        let size = bytes.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .cache_control(&self.cache_control);

        if self.public_read {
            request = request.acl(ObjectCannedAcl::PublicRead);
        }

        request.send().await.map_err(|err| {
            let message = match err.code() {
                Some("NoSuchBucket") => format!("Bucket '{}' does not exist", self.bucket),
                Some("AccessDenied") => format!(
                    "Access denied writing s3://{}/{key}, check the AWS credentials and bucket policy",
                    self.bucket
                ),
                _ => format!(
                    "Upload to s3://{}/{key} failed: {}",
                    self.bucket,
                    DisplayErrorContext(&err)
                ),
            };
            LockscreenError::Upload(message)
        })?;

        tracing::debug!(bucket = %self.bucket, key, size, "PutObject succeeded");
        Ok(())
    }

    fn url_for(&self, key: &str) -> String {
        s3_public_url(&self.bucket, key)
    }
}

/// Virtual-hosted style URL of a public object.
pub fn s3_public_url(bucket: &str, key: &str) -> String {
    format!("https://{bucket}.s3.amazonaws.com/{key}")
}

/// Writes objects as files under a local directory.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirStore { root: root.into() }
    }
}

impl ObjectStore for DirStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> LockscreenResult<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| LockscreenError::Upload(format!("{}: {e}", path.display())))
    }

    fn url_for(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        assert_eq!(
            s3_public_url("my-lockscreen", "lockscreen.jpg"),
            "https://my-lockscreen.s3.amazonaws.com/lockscreen.jpg"
        );
    }

    #[tokio::test]
    async fn test_dir_store_overwrites_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path());

        store.put("lockscreen.jpg", vec![1, 2, 3], JPEG_CONTENT_TYPE).await.unwrap();
        store.put("lockscreen.jpg", vec![4, 5], JPEG_CONTENT_TYPE).await.unwrap();

        let written = std::fs::read(dir.path().join("lockscreen.jpg")).unwrap();
        assert_eq!(written, vec![4, 5]);
        assert!(store.url_for("lockscreen.jpg").starts_with("file://"));
    }

    #[tokio::test]
    async fn test_dir_store_creates_nested_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path().join("out"));

        store.put("daily/lockscreen.jpg", vec![0xFF, 0xD8], JPEG_CONTENT_TYPE).await.unwrap();

        assert!(dir.path().join("out/daily/lockscreen.jpg").is_file());
    }
}
