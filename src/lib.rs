// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Safe within realistic value bounds (durations, sizes)
    clippy::cast_precision_loss,      // Acceptable for metrics/display
    clippy::cast_sign_loss,           // Safe where values are known non-negative
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. ShipError in domain module
    clippy::must_use_candidate        // Annotated selectively on critical APIs
)]

pub mod app;
pub mod batch;
pub mod domain;
pub mod identity;
pub mod reliability;
pub mod sender;
pub mod shipper;

// Re-export main types for easy access
pub use batch::RawEvents;
pub use domain::{LogRecord, Severity, ShipError, ShippingEnvelope};
pub use identity::StreamIdentity;
pub use sender::{DispatchAck, QueueTransport, TransportError, TransportFailure};
pub use shipper::{LogShipper, ShipOptions, ShipperSettings};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
