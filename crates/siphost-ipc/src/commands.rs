//! Commands sent from presentation surfaces to the session host.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::DEFAULT_SIP_PORT;

/// Commands a presentation surface can send to the host.
///
/// Delivery is fire-and-forget; results surface later as
/// [`SessionEvent`](crate::SessionEvent)s on the broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HostCommand {
    /// Register an account with the given registrar.
    Register {
        username: String,
        host: String,
        password: String,
        port: u16,
    },

    /// Republish the current registration status as a fresh event.
    RequestRegistrationState,

    /// Republish the current call status as a fresh event.
    RequestCallState,

    /// Terminate the current call, if any.
    TerminateCall,

    /// Shut the host down. Terminal; no command is processed after it.
    Exit,
}

impl HostCommand {
    /// Returns a simple string representation of the command, safe to
    /// log (no credentials).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "Register",
            Self::RequestRegistrationState => "RequestRegistrationState",
            Self::RequestCallState => "RequestCallState",
            Self::TerminateCall => "TerminateCall",
            Self::Exit => "Exit",
        }
    }

    /// Convenience constructor with the default SIP port.
    pub fn register(username: &str, host: &str, password: &str) -> Self {
        Self::Register {
            username: username.to_string(),
            host: host.to_string(),
            password: password.to_string(),
            port: DEFAULT_SIP_PORT,
        }
    }
}

/// Input rejected before it reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Registration requires a username.
    #[error("username is empty")]
    EmptyUsername,

    /// Registration requires a registrar host.
    #[error("host is empty")]
    EmptyHost,

    /// The port field could not be parsed.
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Fail-fast check shared by the dispatcher and the presentation side.
///
/// A command that fails here is refused synchronously: no broadcast
/// event, no engine mutation.
pub fn validate_registration(username: &str, host: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::EmptyUsername);
    }
    if host.is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_registration_ok() {
        assert!(validate_registration("alice", "sip.example.com").is_ok());
    }

    #[test]
    fn test_validate_registration_empty_username() {
        assert_eq!(
            validate_registration("", "sip.example.com"),
            Err(ValidationError::EmptyUsername)
        );
    }

    #[test]
    fn test_validate_registration_empty_host() {
        assert_eq!(
            validate_registration("alice", ""),
            Err(ValidationError::EmptyHost)
        );
    }
}
