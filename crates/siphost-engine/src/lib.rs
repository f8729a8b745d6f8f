//! Session host core.
//!
//! This crate coordinates one external SIP engine instance: it
//! serializes lifecycle commands, derives typed registration and call
//! statuses from the engine's raw notifications, and republishes every
//! transition on an ordered multicast event feed.

mod call;
mod engine;
mod error;
mod handle;
mod host;
mod registration;

pub use call::{CallMachine, CallTransition};
pub use engine::{
    AccountParams, AccountSnapshot, AuthInfo, CallSnapshot, EngineNotification, RawCallState,
    RawRegistrationState, SipEngine,
};
pub use error::EngineError;
pub use handle::EngineHandle;
pub use host::{IncomingCallObserver, SessionHost};
pub use registration::RegistrationMachine;

use crossbeam_channel::Receiver;
use siphost_ipc::{HostCommand, SessionEvent};
use tokio::sync::broadcast;

/// Create a session host around an engine, wired to the given
/// command channel and broadcast sender.
pub fn create_host(
    engine: Box<dyn SipEngine>,
    command_rx: Receiver<HostCommand>,
    event_tx: broadcast::Sender<SessionEvent>,
    observer: Box<dyn IncomingCallObserver>,
) -> SessionHost {
    SessionHost::new(engine, command_rx, event_tx, observer)
}
