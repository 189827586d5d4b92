pub mod credentials;
pub mod dispatcher;
pub mod http;
pub mod metrics;
pub mod sqs;
pub mod transport;

pub use credentials::{AwsCredentials, CredentialError, CredentialResolver, EnvCredentialResolver};
pub use dispatcher::{DEFAULT_MAX_IN_FLIGHT, DispatchReport, Dispatcher};
pub use http::{ConnectionStats, HttpQueueTransport, HttpTransportConfig};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use sqs::SqsTransport;
pub use transport::{DispatchAck, QueueTransport, TransportError, TransportFailure, content_hash};
