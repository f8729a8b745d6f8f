//! Common value types used across host messages.

use serde::{Deserialize, Serialize};

/// Default SIP signaling port.
pub const DEFAULT_SIP_PORT: u16 = 5060;

/// A registrar domain the account connects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Registrar host name or address.
    pub host: String,

    /// Registrar port; `None` means the default SIP port.
    pub port: Option<u16>,
}

impl Domain {
    /// The `host:port` authority, with the default port filled in.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(DEFAULT_SIP_PORT))
    }

    /// The registrar server URI, e.g. `sip:sip.example.com:5060`.
    pub fn server_uri(&self) -> String {
        format!("sip:{}", self.authority())
    }
}

/// User credentials for registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account login (SIP username).
    pub login: String,

    /// Account password; may be empty.
    pub password: String,
}

/// Identity of a registered account, as carried in broadcast events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// SIP username.
    pub username: String,

    /// Registrar authority the account is registered against.
    pub domain: String,
}

impl AccountInfo {
    /// The account identity URI, e.g. `sip:alice@sip.example.com:5060`.
    pub fn identity_uri(&self) -> String {
        format!("sip:{}@{}", self.username, self.domain)
    }
}

/// Opaque identifier of one call session, assigned by the engine.
///
/// After a `Released` event the identifier is dead; no operation may
/// be issued against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(pub u64);

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// A call as carried in broadcast events: the handle plus the remote
/// party address needed for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallInfo {
    /// Engine-assigned call handle.
    pub id: CallId,

    /// Remote party URI, e.g. `sip:bob@sip.example.com`.
    pub remote: String,
}
