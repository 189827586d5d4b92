use super::transport::{QueueTransport, TransportError};
use crate::domain::ShippingEnvelope;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

const MESSAGE_GROUP_HEADER: &str = "x-message-group-id";
const SHIPPER_VERSION_HEADER: &str = "x-shipper-version";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub timeout: Duration,
    pub connection_timeout: Duration,
    pub max_connections: usize,
    pub keep_alive_timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9324/queue/log-shipping".to_string(),
            timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
            max_connections: 20,
            keep_alive_timeout: Duration::from_secs(60),
            user_agent: concat!("rask-log-shipper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time: Duration,
}

#[derive(Debug, Default)]
struct ClientStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time: AtomicU64,
}

impl ClientStats {
    fn record_request(&self, success: bool, response_time: Duration) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time
            .fetch_add(response_time.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueueResponse {
    message_id: Option<String>,
}

/// Queue transport speaking JSON over HTTP, for queue gateways and local
/// emulators.
///
/// Each envelope is POSTed as the request body. A 2xx response may carry
/// `{"messageId": "..."}`; when it does not, a local id is generated.
#[derive(Debug, Clone)]
pub struct HttpQueueTransport {
    client: Client,
    config: HttpTransportConfig,
    endpoint_url: Url,
    stats: Arc<ClientStats>,
}

impl HttpQueueTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let endpoint_url: Url = config.endpoint.parse().map_err(|e| {
            TransportError::InvalidConfiguration(format!("Invalid endpoint URL: {e}"))
        })?;

        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connection_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.keep_alive_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                TransportError::InvalidConfiguration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            config,
            endpoint_url,
            stats: Arc::new(ClientStats::default()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        let total_requests = self.stats.total_requests.load(Ordering::Relaxed);
        let total_response_time = self.stats.total_response_time.load(Ordering::Relaxed);

        let average_response_time = if total_requests > 0 {
            Duration::from_millis(total_response_time / total_requests)
        } else {
            Duration::ZERO
        };

        ConnectionStats {
            total_requests,
            successful_requests: self.stats.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.stats.failed_requests.load(Ordering::Relaxed),
            average_response_time,
        }
    }

    fn build_headers(&self, envelope: &ShippingEnvelope) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(MESSAGE_GROUP_HEADER),
            HeaderValue::from_str(&envelope.stream_identity).map_err(|e| {
                TransportError::InvalidConfiguration(format!("Invalid stream identity header: {e}"))
            })?,
        );
        headers.insert(
            HeaderName::from_static(SHIPPER_VERSION_HEADER),
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        Ok(headers)
    }
}

impl QueueTransport for HttpQueueTransport {
    async fn send(&self, envelope: &ShippingEnvelope) -> Result<String, TransportError> {
        let body = envelope.encode()?;
        let headers = self.build_headers(envelope)?;
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint_url.clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, start.elapsed());
                return Err(if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(e.to_string())
                });
            }
        };

        let status = response.status();
        self.stats.record_request(status.is_success(), start.elapsed());

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(classify_status(status, message));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let message_id = serde_json::from_str::<QueueResponse>(&text)
            .ok()
            .and_then(|r| r.message_id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        debug!("HTTP queue accepted message {} with {}", message_id, status);
        Ok(message_id)
    }
}

fn classify_status(status: StatusCode, message: String) -> TransportError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        TransportError::Unavailable(format!("HTTP {}: {}", status.as_u16(), message))
    } else {
        TransportError::Rejected {
            code: status.as_u16().to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let config = HttpTransportConfig {
            endpoint: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpQueueTransport::new(config),
            Err(TransportError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_retryable());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        match classify_status(StatusCode::BAD_REQUEST, "bad".to_string()) {
            TransportError::Rejected { code, message } => {
                assert_eq!(code, "400");
                assert_eq!(message, "bad");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_stats_start_empty() {
        let transport = HttpQueueTransport::new(HttpTransportConfig::default()).unwrap();
        assert_eq!(transport.connection_stats().total_requests, 0);
        assert_eq!(transport.endpoint(), HttpTransportConfig::default().endpoint);
    }
}
