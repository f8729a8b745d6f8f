//! Error types for the session host core.

use thiserror::Error;

use siphost_ipc::CallId;

/// Errors surfaced by the engine handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Username or host was empty; checked before touching the engine.
    #[error("missing {0}")]
    MissingCredentials(&'static str),

    /// The composed SIP address could not be parsed.
    #[error("invalid SIP address: {0}")]
    AddressInvalid(String),

    /// The referenced call no longer exists.
    #[error("call already released: {0}")]
    AlreadyReleased(CallId),

    /// The engine rejected the operation.
    #[error("engine rejected the operation: {0}")]
    Rejected(String),
}

impl EngineError {
    /// Validation errors are refused before any engine mutation and
    /// never surface as broadcast events.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingCredentials(_) | Self::AddressInvalid(_))
    }
}
