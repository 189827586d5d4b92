use crate::sender::{CredentialError, TransportFailure};
use thiserror::Error;

/// Top-level error returned by the shipping facade.
#[derive(Error, Debug)]
pub enum ShipError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Destination log group is required")]
    MissingDestination,

    #[error("{} of {attempted} chunks failed to dispatch", failures.len())]
    AggregateDispatch {
        attempted: usize,
        failures: Vec<TransportFailure>,
    },

    #[error("Stream identity resolution failed: {0}")]
    IdentityResolution(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl ShipError {
    /// Both validation kinds are raised before any transport call.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, ShipError::InvalidInput(_) | ShipError::MissingDestination)
    }

    pub fn failures(&self) -> &[TransportFailure] {
        match self {
            ShipError::AggregateDispatch { failures, .. } => failures,
            _ => &[],
        }
    }
}
