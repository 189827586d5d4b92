use super::{Config, ConfigError, TransportKind};
use crate::batch::MIN_CHUNK_BYTES;
use crate::domain::{ENVELOPE_HEADROOM_BYTES, TRANSPORT_MAX_PAYLOAD_BYTES};
use crate::reliability::RetryPolicy;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate the address of the selected transport
        match self.transport {
            TransportKind::Sqs => {
                Url::parse(&self.queue_url).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid queue URL '{}': {}", self.queue_url, e))
                })?;
            }
            TransportKind::Http => {
                Url::parse(&self.http_endpoint).map_err(|e| {
                    ConfigError::InvalidUrl(format!(
                        "Invalid HTTP endpoint URL '{}': {}",
                        self.http_endpoint, e
                    ))
                })?;
            }
        }

        // Chunks plus envelope must fit under the transport ceiling
        let max_chunk_bytes = TRANSPORT_MAX_PAYLOAD_BYTES - ENVELOPE_HEADROOM_BYTES;
        if self.max_chunk_bytes < MIN_CHUNK_BYTES || self.max_chunk_bytes > max_chunk_bytes {
            return Err(ConfigError::InvalidConfig(format!(
                "max_chunk_bytes ({}) must be between {} and {}",
                self.max_chunk_bytes, MIN_CHUNK_BYTES, max_chunk_bytes
            )));
        }

        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_in_flight must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.use_named_credentials && self.credentials_name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "credentials_name is required with named credentials".to_string(),
            ));
        }

        RetryPolicy::from(&self.retry)
            .validate()
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?;

        Ok(())
    }
}
