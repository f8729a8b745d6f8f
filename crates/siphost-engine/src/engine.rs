//! The seam to the external SIP protocol stack.
//!
//! The engine is an opaque collaborator: it maintains account
//! registrations and call sessions and reports changes through a
//! single listener. The listener is a fixed-shape message funneled
//! through a channel rather than an open callback interface, so all
//! notifications reach the host's sequencing loop regardless of which
//! engine thread produced them.

use crossbeam_channel::Sender;

use siphost_ipc::CallId;

use crate::error::EngineError;

/// Raw registration states as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawRegistrationState {
    /// A REGISTER transaction is in flight.
    Progress,

    /// The registrar accepted the registration.
    Ok,

    /// The registration was cleared (unregistered).
    Cleared,

    /// The registration failed terminally.
    Failed,
}

/// Raw call states as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawCallState {
    /// A remote party is calling.
    IncomingReceived,

    /// An outgoing call is being placed.
    OutgoingInit,

    /// Media streams are running.
    StreamsRunning,

    /// The call session was released.
    Released,
}

/// Snapshot of an engine-maintained account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSnapshot {
    /// SIP username.
    pub username: String,

    /// Registrar authority (`host:port`).
    pub domain: String,

    /// Current registration state of this account.
    pub state: RawRegistrationState,
}

/// Snapshot of an engine-maintained call session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    /// Engine-assigned call handle.
    pub id: CallId,

    /// Remote party URI.
    pub remote: String,

    /// Current state of this call.
    pub state: RawCallState,
}

/// A raw notification emitted by the engine on its own thread.
#[derive(Debug, Clone)]
pub enum EngineNotification {
    /// Account registration state changed.
    Registration {
        /// The affected account, absent on teardown.
        account: Option<AccountSnapshot>,

        /// The new raw state, if the engine reported one.
        state: Option<RawRegistrationState>,

        /// Engine-provided message, e.g. a failure description.
        message: String,
    },

    /// Call state changed.
    Call {
        /// The affected call.
        call: CallSnapshot,
    },
}

/// Authentication record handed to the engine before registration.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    pub username: String,
    pub password: String,
    pub realm: String,
}

/// Parameters for an account registered with the engine.
#[derive(Debug, Clone)]
pub struct AccountParams {
    /// Identity URI, e.g. `sip:alice@sip.example.com:5060`.
    pub identity: String,

    /// Registrar server URI, e.g. `sip:sip.example.com:5060`.
    pub server: String,

    /// Whether the engine should keep the registration refreshed.
    pub register: bool,
}

/// The external SIP engine.
///
/// Implementations own all protocol, media and network activity. The
/// added account becomes the engine's default account; `default_account`
/// and `current_call` are non-blocking snapshot reads that never
/// trigger network activity.
pub trait SipEngine: Send {
    /// Store an authentication record.
    fn add_auth(&mut self, auth: AuthInfo) -> Result<(), EngineError>;

    /// Register an account and make it the default.
    fn add_account(&mut self, params: AccountParams) -> Result<(), EngineError>;

    /// Attach the notification listener. At most one listener is
    /// active; attaching again replaces it.
    fn attach_listener(&mut self, notifications: Sender<EngineNotification>);

    /// Detach the notification listener.
    fn detach_listener(&mut self);

    /// Start the engine's network activity.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Stop the engine's network activity.
    fn stop(&mut self) -> Result<(), EngineError>;

    /// Remove all accounts.
    fn clear_accounts(&mut self) -> Result<(), EngineError>;

    /// Remove all stored authentication records.
    fn clear_auth(&mut self) -> Result<(), EngineError>;

    /// Snapshot of the default account, if any.
    fn default_account(&self) -> Option<AccountSnapshot>;

    /// Snapshot of the current call, if any.
    fn current_call(&self) -> Option<CallSnapshot>;

    /// Request termination of a specific call.
    fn terminate_call(&mut self, id: CallId) -> Result<(), EngineError>;
}
