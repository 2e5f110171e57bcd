//! AWS Signature Version 4 request signing shared by the SQS and S3 clients.
//!
//! Implements the AWS Signature V4 signing process:
//! 1. Create canonical request (method, URI, query, headers, payload hash)
//! 2. Create string to sign (algorithm, timestamp, scope, request hash)
//! 3. Derive signing key (4-level HMAC chain)
//! 4. Calculate signature and build Authorization header
//!
//! ## References
//!
//! - [AWS Signature V4](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
//! - [Signing Process](https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html)

use crate::config::AwsConfig;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

#[cfg(test)]
#[path = "signing_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// AWS Signature Version 4 signer for one service in one region
#[derive(Clone)]
pub(crate) struct AwsV4Signer {
    access_key: String,
    secret_key: String,
    session_token: Option<String>,
    region: String,
    service: String,
}

impl AwsV4Signer {
    /// Create new AWS Signature V4 signer
    ///
    /// # Arguments
    ///
    /// * `access_key` - AWS access key ID
    /// * `secret_key` - AWS secret access key
    /// * `session_token` - Temporary credential session token, if any
    /// * `region` - AWS region (e.g., "us-east-1")
    /// * `service` - Signing name of the service ("sqs", "s3")
    pub(crate) fn new(
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
        region: String,
        service: &str,
    ) -> Self {
        Self {
            access_key,
            secret_key,
            session_token,
            region,
            service: service.to_string(),
        }
    }

    /// Build a signer from configured or environment credentials
    pub(crate) fn from_config(aws: &AwsConfig, service: &str) -> Option<Self> {
        aws.credentials().map(|(access_key, secret_key, session_token)| {
            Self::new(
                access_key,
                secret_key,
                session_token,
                aws.region.clone(),
                service,
            )
        })
    }

    /// Sign an HTTP request with AWS Signature V4
    ///
    /// Returns the headers to add to the request: `Authorization`,
    /// `x-amz-date`, `x-amz-content-sha256` and, for temporary credentials,
    /// `x-amz-security-token`. The `host` header is signed but not returned;
    /// the HTTP client derives it from the request URL.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method (GET, POST, PUT)
    /// * `host` - Endpoint host including a non-default port
    /// * `path` - URI-encoded request path (e.g., "/")
    /// * `query_params` - Query parameters as key-value pairs
    /// * `payload` - Request body
    /// * `timestamp` - Request timestamp
    pub(crate) fn sign_request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        query_params: &[(String, String)],
        payload: &[u8],
        timestamp: &DateTime<Utc>,
    ) -> Vec<(String, String)> {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        // Canonical query string (sorted by encoded key then value)
        let mut canonical_query = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>();
        canonical_query.sort();
        let canonical_query = canonical_query.join("&");

        // Canonical headers (must be sorted)
        let mut signed: Vec<(&str, &str)> = vec![
            ("host", host),
            ("x-amz-content-sha256", payload_hash.as_str()),
            ("x-amz-date", amz_date.as_str()),
        ];
        if let Some(ref token) = self.session_token {
            signed.push(("x-amz-security-token", token.as_str()));
        }
        let canonical_headers: String = signed
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_headers = signed
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, path, canonical_query, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key =
            derive_signing_key(&self.secret_key, &date_stamp, &self.region, &self.service);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.access_key, credential_scope, signed_headers, signature
        );

        let mut headers = vec![
            ("Authorization".to_string(), authorization),
            ("x-amz-date".to_string(), amz_date.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ];
        if let Some(ref token) = self.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }

        headers
    }
}

/// Host header value for a URL, keeping non-default ports
pub(crate) fn host_header(url: &url::Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Derive the signing key:
/// kSecret = "AWS4" + secret_key, then HMAC over date, region, service and
/// "aws4_request" in turn
pub(crate) fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k_secret = format!("AWS4{}", secret_key);
    let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
