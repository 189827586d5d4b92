use super::credentials::{AwsCredentials, CredentialResolver};
use super::transport::{QueueTransport, TransportError};
use crate::domain::{ShipError, ShippingEnvelope};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::config::Credentials;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::operation::send_message::SendMessageError;
use sha2::{Digest, Sha256};
use tracing::debug;

const CREDENTIALS_PROVIDER_NAME: &str = "rask-log-shipper";

/// SQS limit on `MessageGroupId` length.
const MAX_MESSAGE_GROUP_ID_LEN: usize = 128;

/// Error codes SQS returns for conditions that clear up on their own.
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "ThrottlingException",
    "RequestThrottled",
    "ServiceUnavailable",
    "InternalError",
    "InternalFailure",
    "KmsThrottled",
];

/// Sends each envelope as one SQS message.
///
/// On FIFO queues the stream identity becomes the message group, so chunks
/// of one stream are delivered in send order relative to each other.
/// Identities longer than SQS allows are replaced by their SHA-256 hex digest.
#[derive(Debug, Clone)]
pub struct SqsTransport {
    client: aws_sdk_sqs::Client,
    queue_url: String,
    fifo: bool,
}

impl SqsTransport {
    pub fn new(client: aws_sdk_sqs::Client, queue_url: impl Into<String>, fifo: bool) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            fifo,
        }
    }

    /// Uses the ambient AWS configuration chain.
    pub async fn from_env(queue_url: impl Into<String>, fifo: bool) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url, fifo)
    }

    pub async fn from_credentials(
        credentials: &AwsCredentials,
        queue_url: impl Into<String>,
        fifo: bool,
    ) -> Self {
        let provider = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            CREDENTIALS_PROVIDER_NAME,
        );
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(provider)
            .load()
            .await;
        Self::new(aws_sdk_sqs::Client::new(&config), queue_url, fifo)
    }

    /// Resolves credentials by logical name; resolver errors pass through.
    pub async fn from_resolver<R: CredentialResolver>(
        resolver: &R,
        credentials_name: &str,
        queue_url: impl Into<String>,
        fifo: bool,
    ) -> Result<Self, ShipError> {
        let credentials = resolver.resolve(credentials_name).await?;
        Ok(Self::from_credentials(&credentials, queue_url, fifo).await)
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

impl QueueTransport for SqsTransport {
    async fn send(&self, envelope: &ShippingEnvelope) -> Result<String, TransportError> {
        let body = envelope.encode()?;

        let mut request = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        if self.fifo {
            request = request
                .message_group_id(message_group_id(&envelope.stream_identity))
                .message_deduplication_id(uuid::Uuid::new_v4().simple().to_string());
        }

        let output = request.send().await.map_err(classify_sdk_error)?;
        let message_id = output.message_id().unwrap_or_default().to_string();

        debug!("SQS accepted message {} on {}", message_id, self.queue_url);
        Ok(message_id)
    }
}

fn classify_sdk_error(err: SdkError<SendMessageError>) -> TransportError {
    match &err {
        SdkError::TimeoutError(_) => TransportError::Timeout,
        SdkError::ServiceError(_) => {
            let code = err.code().unwrap_or("Unknown").to_string();
            let message = err.message().unwrap_or_default().to_string();
            if is_transient_code(&code) {
                TransportError::Unavailable(format!("{code}: {message}"))
            } else {
                TransportError::Rejected { code, message }
            }
        }
        SdkError::ConstructionFailure(_) => {
            TransportError::InvalidConfiguration(DisplayErrorContext(&err).to_string())
        }
        _ => TransportError::Network(DisplayErrorContext(&err).to_string()),
    }
}

fn message_group_id(stream_identity: &str) -> String {
    if stream_identity.len() <= MAX_MESSAGE_GROUP_ID_LEN {
        stream_identity.to_string()
    } else {
        hex::encode(Sha256::digest(stream_identity.as_bytes()))
    }
}

fn is_transient_code(code: &str) -> bool {
    TRANSIENT_ERROR_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_codes() {
        assert!(is_transient_code("ThrottlingException"));
        assert!(!is_transient_code("InvalidMessageContents"));
        assert!(!is_transient_code("AWS.SimpleQueueService.NonExistentQueue"));
    }

    #[test]
    fn test_short_identity_is_the_message_group() {
        let identity = "orders-2024/01/01/[$LATEST]abc-5f0c";
        assert_eq!(message_group_id(identity), identity);
    }

    #[test]
    fn test_long_identity_is_hashed_into_the_group_limit() {
        let identity = format!(
            "{}-2024/01/01/[$LATEST]0123456789abcdef0123456789abcdef-{}",
            "a".repeat(64),
            uuid::Uuid::new_v4()
        );
        assert!(identity.len() > MAX_MESSAGE_GROUP_ID_LEN);

        let group = message_group_id(&identity);
        assert!(group.len() <= MAX_MESSAGE_GROUP_ID_LEN);
        assert_eq!(group.len(), 64);
        assert_eq!(group, message_group_id(&identity));
        assert_ne!(group, message_group_id(&format!("{identity}x")));
    }

    #[test]
    fn test_timeout_maps_to_retryable_timeout() {
        let err = SdkError::<SendMessageError>::timeout_error("operation timed out");
        let mapped = classify_sdk_error(err);
        assert!(matches!(mapped, TransportError::Timeout));
        assert!(mapped.is_retryable());
    }

    #[test]
    fn test_construction_failure_is_not_retryable() {
        let err = SdkError::<SendMessageError>::construction_failure("missing queue url");
        let mapped = classify_sdk_error(err);
        assert!(matches!(mapped, TransportError::InvalidConfiguration(_)));
        assert!(!mapped.is_retryable());
    }
}
