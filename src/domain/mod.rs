//! Domain layer for rask-log-shipper.
//!
//! Contains the canonical types shared across all modules:
//! - `Severity`: call severity and its label encoding
//! - `LogRecord` / `ShippingEnvelope`: what travels to the queue
//! - `ShipError`: Top-level error type

pub mod error;
pub mod record;
pub mod severity;

pub use error::ShipError;
pub use record::{ENVELOPE_HEADROOM_BYTES, LogRecord, ShippingEnvelope, TRANSPORT_MAX_PAYLOAD_BYTES};
pub use severity::{LevelEncoding, Severity, encode as encode_level};
