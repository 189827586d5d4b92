use super::groups::RetryConfig;
use super::{ConfigError, LogFormat, LogLevel, TransportKind};
use crate::batch::DEFAULT_MAX_CHUNK_BYTES;
use crate::sender::{DEFAULT_MAX_IN_FLIGHT, HttpTransportConfig};
use crate::shipper::ShipperSettings;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_HTTP_ENDPOINT: &str = "http://localhost:9324/queue/log-shipping";

#[derive(Parser, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue URL the log envelopes are sent to
    #[arg(long, env = "LOG_SHIPPER_QUEUE_URL", default_value = "")]
    pub queue_url: String,

    /// Queue transport
    #[arg(long, env = "LOG_SHIPPER_TRANSPORT", default_value = "sqs")]
    pub transport: TransportKind,

    /// HTTP queue endpoint (used when transport=http)
    #[arg(long, env = "LOG_SHIPPER_HTTP_ENDPOINT", default_value = DEFAULT_HTTP_ENDPOINT)]
    pub http_endpoint: String,

    /// Logical name of the credentials addressing the queue
    #[arg(long, env = "LOG_SHIPPER_CREDENTIALS", default_value = "awsCredentials")]
    pub credentials_name: String,

    /// Resolve credentials by name instead of the ambient AWS chain
    #[arg(long, env = "LOG_SHIPPER_NAMED_CREDENTIALS")]
    pub use_named_credentials: bool,

    /// Queue is FIFO; chunks are grouped by stream identity
    #[arg(long, env = "LOG_SHIPPER_FIFO")]
    pub fifo: bool,

    /// Largest chunk of one log message, in bytes
    #[arg(long, env = "LOG_SHIPPER_MAX_CHUNK_BYTES", default_value = "200000")]
    pub max_chunk_bytes: usize,

    /// Maximum concurrent queue sends per ship call
    #[arg(long, env = "LOG_SHIPPER_MAX_IN_FLIGHT", default_value = "16")]
    pub max_in_flight: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "LOG_SHIPPER_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    /// Retry configuration (config file only)
    #[arg(skip)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            transport: TransportKind::Sqs,
            http_endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
            credentials_name: "awsCredentials".to_string(),
            use_named_credentials: false,
            fifo: false,
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            request_timeout_secs: 30,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            config_file: None,
            request_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        Ok(())
    }

    pub fn shipper_settings(&self) -> ShipperSettings {
        ShipperSettings {
            max_chunk_bytes: self.max_chunk_bytes,
            max_in_flight: self.max_in_flight,
        }
    }

    pub fn http_transport_config(&self) -> HttpTransportConfig {
        HttpTransportConfig {
            endpoint: self.http_endpoint.clone(),
            timeout: self.request_timeout,
            ..HttpTransportConfig::default()
        }
    }
}
