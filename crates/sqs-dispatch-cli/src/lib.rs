//! # SQS Dispatch CLI
//!
//! Command-line interface for sending messages through the SQS dispatcher.
//!
//! This module provides CLI commands for:
//! - Sending a single message with optional delay and headers
//! - Validating and showing the resolved transport configuration

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use sqs_dispatch::{
    ConfigurationError, DeliveryConstraint, DispatchError, MessageDispatcher, MessageId,
    OutgoingMessage, OutgoingOperation, Timestamp, TransportConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// CLI Structure
// ============================================================================

/// SQS Dispatch CLI - send messages to Amazon SQS
#[derive(Parser, Debug)]
#[command(name = "sqs-dispatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send messages to Amazon SQS queues")]
#[command(
    long_about = "Sends messages through the SQS dispatcher with large message offload to S3 and delayed delivery"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SQS_DISPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single message
    Send(SendArgs),

    /// Validate configuration
    Config {
        /// Show resolved configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Arguments of the `send` command
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Logical destination queue
    pub destination: String,

    /// Message body
    #[arg(short, long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the message body from a file
    #[arg(long)]
    pub body_file: Option<PathBuf>,

    /// Message header as key=value, may be repeated
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Delay delivery by this many seconds
    #[arg(short, long, conflicts_with = "not_before")]
    pub delay: Option<i64>,

    /// Do not deliver before this RFC 3339 instant
    #[arg(long)]
    pub not_before: Option<DateTime<Utc>>,

    /// Discard if not received within this many seconds
    #[arg(long)]
    pub time_to_be_received: Option<i64>,

    /// Message id, generated when omitted
    #[arg(long)]
    pub message_id: Option<String>,
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Dispatch(_) => 2,
            Self::CommandFailed { .. } => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Parse arguments and run the selected command
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    run(cli).await
}

/// Run an already parsed command line
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = TransportConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Send(args) => execute_send_command(args, &config).await,
        Commands::Config { show } => execute_config_command(show, &config),
    }
}

fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sqs_dispatch={level},sqs_dispatch_cli={level}",
            level = cli.log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(filter);
    let result = if cli.json_logs {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| CliError::CommandFailed {
        message: format!("Failed to initialize logging: {}", e),
    })
}

async fn execute_send_command(args: SendArgs, config: &TransportConfig) -> Result<(), CliError> {
    let body = read_body(args.body.as_deref(), args.body_file.as_deref()).await?;
    let operation = build_operation(&args, body)?;
    let message_id = operation.message.message_id.clone();

    let dispatcher = MessageDispatcher::from_config(config)?;
    debug!(dispatcher = ?dispatcher, "Created dispatcher");

    dispatcher.dispatch(vec![operation]).await?;

    info!(message_id = %message_id, destination = %args.destination, "Message sent");
    println!("{}", message_id);
    Ok(())
}

fn execute_config_command(show: bool, config: &TransportConfig) -> Result<(), CliError> {
    if !show {
        println!("Configuration is valid");
        return Ok(());
    }

    let rendered = serde_json::to_string_pretty(&redacted(config)).map_err(|e| {
        CliError::CommandFailed {
            message: format!("Failed to render configuration: {}", e),
        }
    })?;
    println!("{}", rendered);
    Ok(())
}

/// Copy of the configuration safe to print
pub fn redacted(config: &TransportConfig) -> TransportConfig {
    let mut config = config.clone();
    let redact = |value: &mut Option<String>| {
        if value.is_some() {
            *value = Some("<redacted>".to_string());
        }
    };
    redact(&mut config.aws.secret_access_key);
    redact(&mut config.aws.session_token);
    config
}

async fn read_body(body: Option<&str>, body_file: Option<&Path>) -> Result<Bytes, CliError> {
    match (body, body_file) {
        (Some(body), _) => Ok(Bytes::copy_from_slice(body.as_bytes())),
        (None, Some(path)) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        (None, None) => Ok(Bytes::new()),
    }
}

/// Build the outgoing operation described by the `send` arguments
pub fn build_operation(args: &SendArgs, body: Bytes) -> Result<OutgoingOperation, CliError> {
    let message_id = match args.message_id {
        Some(ref id) => id.parse::<MessageId>().map_err(|e| CliError::InvalidArgument {
            arg: "message-id".to_string(),
            message: e.to_string(),
        })?,
        None => MessageId::new(),
    };

    let mut message = OutgoingMessage::new(message_id, body);
    for (key, value) in &args.headers {
        message = message.with_header(key.clone(), value.clone());
    }

    let mut operation = OutgoingOperation::new(message, args.destination.clone());

    if let Some(seconds) = args.delay {
        operation = operation.with_constraint(DeliveryConstraint::DelayDeliveryWith(
            non_negative_seconds("delay", seconds)?,
        ));
    }

    if let Some(at) = args.not_before {
        operation = operation.with_constraint(DeliveryConstraint::DoNotDeliverBefore(
            Timestamp::from_datetime(at),
        ));
    }

    if let Some(seconds) = args.time_to_be_received {
        operation = operation.with_constraint(DeliveryConstraint::DiscardIfNotReceivedBefore(
            non_negative_seconds("time-to-be-received", seconds)?,
        ));
    }

    Ok(operation)
}

fn non_negative_seconds(arg: &str, seconds: i64) -> Result<Duration, CliError> {
    if seconds < 0 {
        return Err(CliError::InvalidArgument {
            arg: arg.to_string(),
            message: format!("must not be negative, got {}", seconds),
        });
    }

    Duration::try_seconds(seconds).ok_or_else(|| CliError::InvalidArgument {
        arg: arg.to_string(),
        message: format!("{} seconds is out of range", seconds),
    })
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", value)),
    }
}
