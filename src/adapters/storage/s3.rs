use crate::adapters::storage::content_type_for;
use crate::domain::ports::ObjectStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use std::path::Path;

const GCS_HOST: &str = "storage.googleapis.com";

/// Object store speaking the S3 API. Pointed at
/// `https://storage.googleapis.com` with HMAC keys it talks to Google Cloud
/// Storage through its interoperability endpoint.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    scheme: &'static str,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String, scheme: &'static str) -> Self {
        Self {
            client,
            bucket,
            scheme,
        }
    }

    /// Builds a client from the default credential chain (environment,
    /// shared profile, instance metadata).
    pub async fn connect(region: &str, endpoint: Option<&str>, bucket: &str) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .region(Region::new(region.to_string()))
            .force_path_style(true);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let scheme = match endpoint {
            Some(url) if url.contains(GCS_HOST) => "gs",
            _ => "s3",
        };
        tracing::debug!(bucket, region, ?endpoint, "Connecting to object storage");

        Self::new(S3Client::from_conf(builder.build()), bucket.to_string(), scheme)
    }

    fn storage_error(action: &str, key: &str, err: impl std::error::Error) -> EtlError {
        EtlError::StorageError {
            message: format!("{} '{}' failed: {}", action, key, DisplayErrorContext(err)),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    fn uri(&self, key: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.bucket, key)
    }

    async fn upload_file(&self, local: &Path, key: &str) -> Result<()> {
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Self::storage_error("Opening", &local.display().to_string(), e))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type_for(key))
            .body(body)
            .send()
            .await
            .map_err(|e| Self::storage_error("Uploading", key, e))?;
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| Self::storage_error("Listing", "buckets", e))?;

        Ok(output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }
}
