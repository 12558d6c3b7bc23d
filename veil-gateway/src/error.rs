//! Gateway error taxonomy

use thiserror::Error;

/// Errors surfaced by [`crate::QueryGateway::answer`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// Query is empty or too long; the caller should report a client error
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The language model could not produce an answer (credentials,
    /// network, provider error or timeout)
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),
}

impl GatewayError {
    /// Human-readable message without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            GatewayError::InvalidInput(msg) | GatewayError::UpstreamFailure(msg) => msg,
        }
    }
}
