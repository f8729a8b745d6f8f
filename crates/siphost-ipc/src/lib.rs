//! Typed host<->presentation messages for the session host.
//!
//! This crate defines all the message types exchanged between
//! presentation surfaces and the session host core, plus the channel
//! constructors both sides share.

mod commands;
mod events;
mod status;
mod types;

pub use commands::{validate_registration, HostCommand, ValidationError};
pub use events::SessionEvent;
pub use status::{CallStatus, RegistrationStatus};
pub use types::{AccountInfo, CallId, CallInfo, Credentials, Domain, DEFAULT_SIP_PORT};

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::broadcast;

/// Channel capacity for commands (presentation → host).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for broadcast events (host → presentation).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<HostCommand>, Receiver<HostCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates the multicast event channel.
///
/// Every subscriber obtained from the sender via `subscribe()` sees
/// events in publish order; subscribers attached after an event was
/// published do not receive it.
pub fn event_channel() -> (
    broadcast::Sender<SessionEvent>,
    broadcast::Receiver<SessionEvent>,
) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}
