//! Derived registration and call status types.

use serde::{Deserialize, Serialize};

use crate::types::{AccountInfo, CallInfo};

/// The registration status derived from engine callbacks.
///
/// Only the host's registration state machine produces values of this
/// type; presentation surfaces consume them read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    /// No active account.
    #[default]
    Unregistered,

    /// A registration attempt is in flight.
    InProgress,

    /// The account is registered.
    Registered(AccountInfo),

    /// The engine reported a terminal registration failure.
    Failed {
        /// Engine-provided failure message.
        reason: String,
    },
}

impl RegistrationStatus {
    /// Returns true if an account is registered.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_))
    }

    /// Returns true if a registration attempt is in flight.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// Returns a simple string representation of the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unregistered => "Unregistered",
            Self::InProgress => "InProgress",
            Self::Registered(_) => "Registered",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// The call status derived from engine callbacks.
///
/// `Idle` models "no current call" as an explicit state. At most one
/// call handle is current at any time; after `Released` any
/// previously distributed [`CallInfo`] is invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallStatus {
    /// No current call.
    #[default]
    Idle,

    /// An incoming call is ringing.
    IncomingReceived(CallInfo),

    /// An outgoing call is being placed.
    OutgoingInit(CallInfo),

    /// Media streams are running.
    StreamsRunning(CallInfo),

    /// The call was released; its handle is now invalid.
    Released,
}

impl CallStatus {
    /// The call carried by this status, if any.
    pub fn call(&self) -> Option<&CallInfo> {
        match self {
            Self::IncomingReceived(call) | Self::OutgoingInit(call) | Self::StreamsRunning(call) => {
                Some(call)
            }
            Self::Idle | Self::Released => None,
        }
    }

    /// Returns a simple string representation of the status.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::IncomingReceived(_) => "IncomingReceived",
            Self::OutgoingInit(_) => "OutgoingInit",
            Self::StreamsRunning(_) => "StreamsRunning",
            Self::Released => "Released",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallId;

    #[test]
    fn test_call_status_carries_handle() {
        let info = CallInfo {
            id: CallId(7),
            remote: "sip:bob@sip.example.com".to_string(),
        };
        let status = CallStatus::IncomingReceived(info.clone());
        assert_eq!(status.call(), Some(&info));
        assert_eq!(CallStatus::Released.call(), None);
        assert_eq!(CallStatus::Idle.call(), None);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(RegistrationStatus::Unregistered.name(), "Unregistered");
        assert_eq!(CallStatus::Idle.name(), "Idle");
    }
}
