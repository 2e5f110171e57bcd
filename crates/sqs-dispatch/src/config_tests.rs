//! Tests for transport configuration.

use super::*;
use std::io::Write;

fn write_config_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file.flush().expect("flush config");
    file
}

#[test]
fn test_default_configuration_is_valid() {
    let config = TransportConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.aws.region, "us-east-1");
    assert!(config.large_messages.is_none());
    assert!(!config.delayed_delivery.enabled);
    assert_eq!(config.delayed_delivery.queue_delay_time(), Duration::minutes(15));
}

#[test]
fn test_load_yaml_file() {
    let file = write_config_file(
        ".yaml",
        r#"
queue_name_prefix: "prod-"
aws:
  region: eu-west-1
  endpoint_url: "http://localhost:4566"
large_messages:
  bucket: large-bodies
  key_prefix: outgoing
delayed_delivery:
  enabled: true
  queue_delay_time_seconds: 600
"#,
    );

    let config = TransportConfig::load(Some(file.path())).expect("config should load");

    assert_eq!(config.queue_name_prefix, "prod-");
    assert_eq!(config.aws.region, "eu-west-1");
    assert_eq!(config.aws.sqs_endpoint(), "http://localhost:4566");
    assert_eq!(config.aws.s3_endpoint(), "https://s3.eu-west-1.amazonaws.com");
    assert_eq!(config.aws.request_timeout_seconds, 30);
    assert_eq!(
        config.large_messages,
        Some(S3Config {
            bucket: "large-bodies".to_string(),
            key_prefix: "outgoing".to_string(),
        })
    );
    assert!(config.delayed_delivery.enabled);
    assert_eq!(config.delayed_delivery.queue_delay_time(), Duration::minutes(10));
}

#[test]
fn test_load_toml_file_with_partial_sections() {
    let file = write_config_file(
        ".toml",
        r#"
queue_name_prefix = "dev-"

[delayed_delivery]
enabled = true
"#,
    );

    let config = TransportConfig::load(Some(file.path())).expect("config should load");

    assert_eq!(config.queue_name_prefix, "dev-");
    assert!(config.delayed_delivery.enabled);
    assert_eq!(config.delayed_delivery.queue_delay_time_seconds, 900);
    assert_eq!(config.aws, AwsConfig::default());
}

#[test]
fn test_load_missing_file_fails() {
    let result = TransportConfig::load(Some(Path::new("/nonexistent/sqs-dispatch.yaml")));
    assert!(matches!(result, Err(ConfigurationError::Parsing { .. })));
}

#[test]
fn test_threshold_above_native_maximum_is_rejected() {
    let mut config = TransportConfig::default();
    config.delayed_delivery.queue_delay_time_seconds = 901;

    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::Invalid { .. })
    ));

    config.delayed_delivery.queue_delay_time_seconds = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_empty_bucket_is_rejected() {
    let config = TransportConfig {
        large_messages: Some(S3Config {
            bucket: " ".to_string(),
            key_prefix: String::new(),
        }),
        ..Default::default()
    };

    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::Missing { key }) if key == "large_messages.bucket"
    ));
}

#[test]
fn test_empty_region_is_rejected() {
    let mut config = TransportConfig::default();
    config.aws.region = String::new();

    assert!(config.validate().is_err());
}

#[test]
fn test_object_key_format() {
    let s3 = S3Config {
        bucket: "bucket".to_string(),
        key_prefix: "outgoing/".to_string(),
    };
    assert_eq!(s3.object_key("abc"), "outgoing/abc");

    let s3 = S3Config {
        bucket: "bucket".to_string(),
        key_prefix: "prefix".to_string(),
    };
    assert_eq!(s3.object_key("abc"), "prefix/abc");
}
