//! Console presentation surfaces.
//!
//! Each screen owns its own broadcast subscription; both observe the
//! same event stream independently and in the same order.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use siphost_engine::IncomingCallObserver;
use siphost_ipc::{
    CallInfo, CallStatus, Credentials, Domain, RegistrationStatus, SessionEvent, DEFAULT_SIP_PORT,
};
use siphost_store::{SettingsStore, StoredSettings};

/// Registration details entered by the user, held until the engine
/// confirms them so the screen persists what actually registered.
pub type PendingRegistration = Arc<Mutex<Option<(Domain, Credentials)>>>;

/// The registration screen: shows registration progress, persists the
/// confirmed credentials, and falls back to the registration form when
/// unregistered.
pub fn spawn_registration_screen(
    mut rx: Receiver<SessionEvent>,
    store: SettingsStore,
    pending: PendingRegistration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Registration(status)) => {
                    on_registration(&status, &store, &pending)
                }
                Ok(SessionEvent::Call(_)) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "registration screen lagged, events missed");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn on_registration(status: &RegistrationStatus, store: &SettingsStore, pending: &PendingRegistration) {
    match status {
        RegistrationStatus::InProgress => println!("registering..."),
        RegistrationStatus::Registered(account) => {
            println!("registered as {}", account.identity_uri());
            if let Some((domain, credentials)) = pending.lock().take() {
                let settings = StoredSettings {
                    domain: Some(domain),
                    credentials: Some(credentials),
                };
                let changed = store.load().map(|saved| saved != settings).unwrap_or(true);
                if changed {
                    if let Err(e) = store.save(&settings) {
                        warn!(error = %e, "failed to persist credentials");
                    }
                }
            }
        }
        RegistrationStatus::Failed { reason } => println!("registration failed: {reason}"),
        RegistrationStatus::Unregistered => {
            let saved = store.load().unwrap_or_default();
            match (saved.credentials, saved.domain) {
                (Some(credentials), Some(domain)) => println!(
                    "not registered; last used: register {} {} <password> {}",
                    credentials.login,
                    domain.host,
                    domain.port.unwrap_or(DEFAULT_SIP_PORT),
                ),
                _ => println!("not registered; use: register <username> <host> [password] [port]"),
            }
        }
    }
}

/// The in-call screen.
pub fn spawn_call_screen(mut rx: Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SessionEvent::Call(status)) => on_call(&status),
                Ok(SessionEvent::Registration(_)) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "call screen lagged, events missed");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn on_call(status: &CallStatus) {
    match status {
        CallStatus::Idle => println!("no current call"),
        CallStatus::IncomingReceived(call) => {
            println!(
                "incoming call {} from {} (type 'terminate' to hang up)",
                call.id, call.remote
            );
        }
        CallStatus::OutgoingInit(call) => println!("calling {}", call.remote),
        CallStatus::StreamsRunning(call) => println!("in call with {}", call.remote),
        CallStatus::Released => println!("call ended"),
    }
}

/// Brings up the call screen when the engine reports an incoming call.
pub struct CallScreenLauncher;

impl IncomingCallObserver for CallScreenLauncher {
    fn on_incoming_call(&self, call: &CallInfo) {
        info!(id = %call.id, remote = %call.remote, "bringing up call screen");
    }
}
