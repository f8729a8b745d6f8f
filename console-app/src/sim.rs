//! Simulated SIP engine.
//!
//! Stands in for the external protocol stack so the console host can
//! run end to end: registration reports Progress then Ok shortly after
//! start, and incoming calls are injected through the controller.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::warn;

use siphost_engine::{
    AccountParams, AccountSnapshot, AuthInfo, CallSnapshot, EngineError, EngineNotification,
    RawCallState, RawRegistrationState, SipEngine,
};
use siphost_ipc::CallId;

#[derive(Default)]
struct Inner {
    listener: Option<Sender<EngineNotification>>,
    auth: Option<AuthInfo>,
    account: Option<AccountSnapshot>,
    call: Option<CallSnapshot>,
    next_call_id: u64,
    running: bool,
}

/// The simulated engine handed to the session host.
pub struct SimulatedEngine {
    inner: Arc<Mutex<Inner>>,
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// A handle for injecting engine-side activity from outside.
    pub fn controller(&self) -> SimController {
        SimController {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Injects simulated remote activity, e.g. an incoming call.
#[derive(Clone)]
pub struct SimController {
    inner: Arc<Mutex<Inner>>,
}

impl SimController {
    pub fn ring(&self, remote: &str) {
        let mut inner = self.inner.lock();
        if !inner.running {
            warn!("engine not running, ignoring ring");
            return;
        }
        if inner.call.is_some() {
            warn!("already in a call, ignoring ring");
            return;
        }
        inner.next_call_id += 1;
        let call = CallSnapshot {
            id: CallId(inner.next_call_id),
            remote: remote.to_string(),
            state: RawCallState::IncomingReceived,
        };
        inner.call = Some(call.clone());
        let listener = inner.listener.clone();
        drop(inner);
        if let Some(tx) = listener {
            let _ = tx.send(EngineNotification::Call { call });
        }
    }
}

impl SipEngine for SimulatedEngine {
    fn add_auth(&mut self, auth: AuthInfo) -> Result<(), EngineError> {
        self.inner.lock().auth = Some(auth);
        Ok(())
    }

    fn add_account(&mut self, _params: AccountParams) -> Result<(), EngineError> {
        Ok(())
    }

    fn attach_listener(&mut self, notifications: Sender<EngineNotification>) {
        self.inner.lock().listener = Some(notifications);
    }

    fn detach_listener(&mut self) {
        self.inner.lock().listener = None;
    }

    fn start(&mut self) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.lock();
            let auth = inner
                .auth
                .clone()
                .ok_or_else(|| EngineError::Rejected("no auth record".to_string()))?;
            inner.running = true;
            inner.account = Some(AccountSnapshot {
                username: auth.username,
                domain: auth.realm,
                state: RawRegistrationState::Progress,
            });
        }

        // The registrar answers on the engine's own thread.
        let inner = Arc::clone(&self.inner);
        thread::spawn(move || {
            let (listener, account) = {
                let guard = inner.lock();
                (guard.listener.clone(), guard.account.clone())
            };
            let Some(account) = account else {
                return;
            };
            if let Some(tx) = &listener {
                let _ = tx.send(EngineNotification::Registration {
                    account: Some(account.clone()),
                    state: Some(RawRegistrationState::Progress),
                    message: String::new(),
                });
            }

            thread::sleep(Duration::from_millis(300));

            let registered = AccountSnapshot {
                state: RawRegistrationState::Ok,
                ..account
            };
            {
                let mut guard = inner.lock();
                if !guard.running {
                    return;
                }
                guard.account = Some(registered.clone());
            }
            if let Some(tx) = &listener {
                let _ = tx.send(EngineNotification::Registration {
                    account: Some(registered),
                    state: Some(RawRegistrationState::Ok),
                    message: String::new(),
                });
            }
        });

        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.call = None;
        Ok(())
    }

    fn clear_accounts(&mut self) -> Result<(), EngineError> {
        self.inner.lock().account = None;
        Ok(())
    }

    fn clear_auth(&mut self) -> Result<(), EngineError> {
        self.inner.lock().auth = None;
        Ok(())
    }

    fn default_account(&self) -> Option<AccountSnapshot> {
        self.inner.lock().account.clone()
    }

    fn current_call(&self) -> Option<CallSnapshot> {
        self.inner.lock().call.clone()
    }

    fn terminate_call(&mut self, id: CallId) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        match inner.call.take() {
            Some(call) if call.id == id => {
                let listener = inner.listener.clone();
                drop(inner);
                if let Some(tx) = listener {
                    let _ = tx.send(EngineNotification::Call {
                        call: CallSnapshot {
                            state: RawCallState::Released,
                            ..call
                        },
                    });
                }
                Ok(())
            }
            other => {
                inner.call = other;
                Err(EngineError::AlreadyReleased(id))
            }
        }
    }
}
