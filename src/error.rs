//! Named error kinds for the bridge.
//!
//! Only [`BridgeError::MissingCredential`] and [`BridgeError::ProducerInitError`] are fatal;
//! every other variant is recovered locally by its caller and surfaced through logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("producer init failed: {0}")]
    ProducerInitError(String),

    #[error("upstream login or contract fetch failed: {0}")]
    LoginOrFetchError(String),

    #[error("tick publish failed: {0}")]
    TickPublishError(String),

    #[error("downstream probe failed: {0}")]
    ProbeError(String),

    #[error("upstream operation failed: {0}")]
    UpstreamOperationError(String),

    #[error("shutdown requested")]
    Shutdown,
}

impl BridgeError {
    /// Only these two kinds escape to exit the process (see propagation policy).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::MissingCredential(_) | BridgeError::ProducerInitError(_)
        )
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
