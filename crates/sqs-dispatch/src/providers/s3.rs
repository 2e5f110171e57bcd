//! HTTP implementation of [`BlobStore`] backed by S3 `PutObject`.

use crate::client::BlobStore;
use crate::config::AwsConfig;
use crate::error::BlobStorageError;
use crate::signing::{host_header, AwsV4Signer};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::Client as HttpClient;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

#[cfg(test)]
#[path = "s3_tests.rs"]
mod tests;

/// S3 client using path-style addressing (`{endpoint}/{bucket}/{key}`)
pub struct S3BlobStore {
    http_client: HttpClient,
    signer: Option<AwsV4Signer>,
    endpoint: Url,
}

impl S3BlobStore {
    /// Create new S3 client from AWS configuration
    pub fn new(aws: &AwsConfig) -> Result<Self, BlobStorageError> {
        let endpoint = Url::parse(&aws.s3_endpoint()).map_err(|e| {
            BlobStorageError::ConfigurationError(format!("Invalid S3 endpoint: {}", e))
        })?;

        let http_client = HttpClient::builder()
            .timeout(aws.request_timeout())
            .build()
            .map_err(|e| {
                BlobStorageError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            signer: AwsV4Signer::from_config(aws, "s3"),
            endpoint,
        })
    }

    /// URI-encoded object path, keeping `/` between key segments
    fn object_path(&self, bucket: &str, key: &str) -> String {
        let base = self.endpoint.path().trim_end_matches('/');
        let encoded_key = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!("{}/{}/{}", base, urlencoding::encode(bucket), encoded_key)
    }
}

impl fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.signer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, body), fields(size = body.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
    ) -> Result<(), BlobStorageError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            BlobStorageError::Authentication("No credentials configured".to_string())
        })?;

        let object_path = self.object_path(bucket, key);
        let mut url = self.endpoint.clone();
        url.set_path(&object_path);

        let auth_headers = signer.sign_request(
            "PUT",
            &host_header(&self.endpoint),
            &object_path,
            &[],
            &body,
            &Utc::now(),
        );

        let mut request = self
            .http_client
            .put(url)
            .header("Content-Type", "application/octet-stream");
        for (name, value) in auth_headers {
            request = request.header(&name, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                BlobStorageError::NetworkError(format!("Request timeout: {}", e))
            } else {
                BlobStorageError::NetworkError(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(bucket = %bucket, key = %key, "Stored object");
            return Ok(());
        }

        let response_body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            404 => BlobStorageError::BucketNotFound(bucket.to_string()),
            401 | 403 => BlobStorageError::Authentication(format!(
                "PutObject was denied ({}): {}",
                status, response_body
            )),
            _ => BlobStorageError::ServiceError(format!(
                "PutObject failed ({}): {}",
                status, response_body
            )),
        })
    }
}
