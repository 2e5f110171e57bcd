//! HTTP implementation of [`SqsClient`] using the AWS Query protocol.
//!
//! Requests are form-encoded POSTs signed with AWS Signature V4; responses
//! are XML. Only the two calls the dispatcher needs are implemented:
//! `GetQueueUrl` and `SendMessage`.

use crate::client::{SendMessageRequest, SqsClient};
use crate::config::AwsConfig;
use crate::error::SqsError;
use crate::queue_name::QueueName;
use crate::signing::{host_header, AwsV4Signer};
use async_trait::async_trait;
use chrono::Utc;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client as HttpClient;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

#[cfg(test)]
#[path = "sqs_tests.rs"]
mod tests;

const API_VERSION: &str = "2012-11-05";

/// SQS client speaking the Query protocol over HTTPS
///
/// The client is thread-safe and can be shared across async tasks using `Arc`.
pub struct SqsHttpClient {
    http_client: HttpClient,
    signer: Option<AwsV4Signer>,
    endpoint: Url,
}

impl SqsHttpClient {
    /// Create new SQS client
    ///
    /// Credentials come from the configuration or the standard AWS
    /// environment variables. Without credentials the client is still
    /// created, but every request fails with [`SqsError::Authentication`].
    ///
    /// # Errors
    ///
    /// Returns error if the region is empty, the endpoint is not a valid URL
    /// or the HTTP client cannot be built.
    pub fn new(aws: &AwsConfig) -> Result<Self, SqsError> {
        if aws.region.is_empty() {
            return Err(SqsError::ConfigurationError(
                "Region cannot be empty".to_string(),
            ));
        }

        let endpoint = Url::parse(&aws.sqs_endpoint()).map_err(|e| {
            SqsError::ConfigurationError(format!("Invalid SQS endpoint: {}", e))
        })?;

        let http_client = HttpClient::builder()
            .timeout(aws.request_timeout())
            .build()
            .map_err(|e| SqsError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            signer: AwsV4Signer::from_config(aws, "sqs"),
            endpoint,
        })
    }

    /// POST a signed Query protocol request and return the response body
    async fn make_request(&self, params: &[(String, String)]) -> Result<String, SqsError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(|| SqsError::Authentication("No credentials configured".to_string()))?;

        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();

        let auth_headers = signer.sign_request(
            "POST",
            &host_header(&self.endpoint),
            self.endpoint.path(),
            &[],
            body.as_bytes(),
            &Utc::now(),
        );

        let mut request = self
            .http_client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/x-www-form-urlencoded");
        for (key, value) in auth_headers {
            request = request.header(&key, value);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                SqsError::NetworkError(format!("Request timeout: {}", e))
            } else if e.is_connect() {
                SqsError::NetworkError(format!("Connection failed: {}", e))
            } else {
                SqsError::NetworkError(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .map_err(|e| SqsError::NetworkError(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(parse_error_response(&response_body, status.as_u16()));
        }

        Ok(response_body)
    }
}

impl fmt::Debug for SqsHttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqsHttpClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("credentials", &self.signer.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl SqsClient for SqsHttpClient {
    #[instrument(skip(self), fields(queue = %queue_name))]
    async fn get_queue_url(&self, queue_name: &QueueName) -> Result<String, SqsError> {
        let params = vec![
            ("Action".to_string(), "GetQueueUrl".to_string()),
            ("QueueName".to_string(), queue_name.as_str().to_string()),
            ("Version".to_string(), API_VERSION.to_string()),
        ];

        let response = self.make_request(&params).await?;
        let queue_url = parse_element_text(&response, b"QueueUrl")?;

        debug!(queue_url = %queue_url, "Resolved queue URL");
        Ok(queue_url)
    }

    #[instrument(skip(self, request), fields(queue_url = %request.queue_url))]
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, SqsError> {
        let response = self.make_request(&request.to_params()).await?;
        let message_id = parse_element_text(&response, b"MessageId")?;

        debug!(sqs_message_id = %message_id, "Message sent");
        Ok(message_id)
    }
}

/// Text of the first element named `element` in an XML response
fn parse_element_text(xml: &str, element: &[u8]) -> Result<String, SqsError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut in_element = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == element => {
                in_element = true;
            }
            Ok(Event::Text(e)) if in_element => {
                return e.unescape().map(|s| s.into_owned()).map_err(|e| {
                    SqsError::SerializationError(format!("Failed to parse XML: {}", e))
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SqsError::SerializationError(format!(
                    "XML parsing error: {}",
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Err(SqsError::SerializationError(format!(
        "{} not found in response",
        String::from_utf8_lossy(element)
    )))
}

/// Map an XML error response to an [`SqsError`]
fn parse_error_response(xml: &str, status_code: u16) -> SqsError {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut error_code = None;
    let mut error_message = None;
    let mut in_error = false;
    let mut in_code = false;
    let mut in_message = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Error" => in_error = true,
                b"Code" if in_error => in_code = true,
                b"Message" if in_error => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_code {
                    error_code = e.unescape().ok().map(|s| s.into_owned());
                    in_code = false;
                } else if in_message {
                    error_message = e.unescape().ok().map(|s| s.into_owned());
                    in_message = false;
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Error" => {
                in_error = false;
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let code = error_code.unwrap_or_else(|| "Unknown".to_string());
    let message = error_message.unwrap_or_else(|| "Unknown error".to_string());

    match code.as_str() {
        "AWS.SimpleQueueService.NonExistentQueue" | "QueueDoesNotExist" => {
            SqsError::QueueNotFound(message)
        }
        "InvalidClientTokenId" | "UnrecognizedClientException" | "SignatureDoesNotMatch" => {
            SqsError::Authentication(format!("{}: {}", code, message))
        }
        _ if status_code == 401 || status_code == 403 => {
            SqsError::Authentication(format!("{}: {}", code, message))
        }
        _ => SqsError::ServiceError(format!("{}: {}", code, message)),
    }
}
