//! End-to-end tests for the session host loop, driven through the
//! public channels with a scripted engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender as CommandSender;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use siphost_engine::{
    create_host, AccountParams, AccountSnapshot, AuthInfo, CallSnapshot, EngineError,
    EngineNotification, IncomingCallObserver, RawCallState, RawRegistrationState, SipEngine,
};
use siphost_ipc::{
    command_channel, event_channel, CallId, CallInfo, CallStatus, HostCommand,
    RegistrationStatus, SessionEvent,
};

#[derive(Default)]
struct MockInner {
    listener: Option<crossbeam_channel::Sender<EngineNotification>>,
    auth: Option<AuthInfo>,
    account: Option<AccountSnapshot>,
    call: Option<CallSnapshot>,
    auth_count: usize,
    account_count: usize,
    start_count: usize,
    stop_count: usize,
    clear_accounts_count: usize,
    clear_auth_count: usize,
    detach_count: usize,
}

/// Scripted engine: registration succeeds immediately, reporting
/// Progress then Ok through the listener, and calls can be injected
/// from the test through the shared inner state.
struct MockEngine {
    inner: Arc<Mutex<MockInner>>,
}

impl SipEngine for MockEngine {
    fn add_auth(&mut self, auth: AuthInfo) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.auth_count += 1;
        inner.auth = Some(auth);
        Ok(())
    }

    fn add_account(&mut self, _params: AccountParams) -> Result<(), EngineError> {
        self.inner.lock().account_count += 1;
        Ok(())
    }

    fn attach_listener(&mut self, notifications: crossbeam_channel::Sender<EngineNotification>) {
        self.inner.lock().listener = Some(notifications);
    }

    fn detach_listener(&mut self) {
        let mut inner = self.inner.lock();
        inner.detach_count += 1;
        inner.listener = None;
    }

    fn start(&mut self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.start_count += 1;
        let auth = inner
            .auth
            .clone()
            .ok_or_else(|| EngineError::Rejected("no auth record".to_string()))?;
        let progress = AccountSnapshot {
            username: auth.username,
            domain: auth.realm,
            state: RawRegistrationState::Progress,
        };
        let registered = AccountSnapshot {
            state: RawRegistrationState::Ok,
            ..progress.clone()
        };
        inner.account = Some(registered.clone());
        let listener = inner.listener.clone();
        drop(inner);

        if let Some(tx) = listener {
            let _ = tx.send(EngineNotification::Registration {
                account: Some(progress),
                state: Some(RawRegistrationState::Progress),
                message: String::new(),
            });
            let _ = tx.send(EngineNotification::Registration {
                account: Some(registered),
                state: Some(RawRegistrationState::Ok),
                message: String::new(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.inner.lock().stop_count += 1;
        Ok(())
    }

    fn clear_accounts(&mut self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.clear_accounts_count += 1;
        inner.account = None;
        Ok(())
    }

    fn clear_auth(&mut self) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.clear_auth_count += 1;
        inner.auth = None;
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

struct CountingObserver(Arc<AtomicUsize>);

impl IncomingCallObserver for CountingObserver {
    fn on_incoming_call(&self, _call: &CallInfo) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    command_tx: CommandSender<HostCommand>,
    events: broadcast::Sender<SessionEvent>,
    inner: Arc<Mutex<MockInner>>,
    incoming_count: Arc<AtomicUsize>,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start() -> (Self, broadcast::Receiver<SessionEvent>) {
        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();
        let inner = Arc::new(Mutex::new(MockInner::default()));
        let incoming_count = Arc::new(AtomicUsize::new(0));

        let engine = Box::new(MockEngine {
            inner: Arc::clone(&inner),
        });
        let observer = Box::new(CountingObserver(Arc::clone(&incoming_count)));
        let host_events = event_tx.clone();
        let thread = thread::spawn(move || {
            let mut host = create_host(engine, command_rx, host_events, observer);
            host.run();
        });

        (
            Self {
                command_tx,
                events: event_tx,
                inner,
                incoming_count,
                thread: Some(thread),
            },
            event_rx,
        )
    }

    fn send(&self, command: HostCommand) {
        self.command_tx.send(command).unwrap();
    }

    /// Injects an incoming call the way the engine would report one.
    fn ring(&self, id: u64, remote: &str) {
        let mut inner = self.inner.lock();
        let call = CallSnapshot {
            id: CallId(id),
            remote: remote.to_string(),
            state: RawCallState::IncomingReceived,
        };
        inner.call = Some(call.clone());
        let listener = inner.listener.clone();
        drop(inner);
        listener
            .expect("listener not attached")
            .send(EngineNotification::Call { call })
            .unwrap();
    }

    fn register(&self, rx: &mut broadcast::Receiver<SessionEvent>) {
        self.send(HostCommand::register("alice", "sip.example.com", "pw"));
        assert_eq!(
            rx.blocking_recv().unwrap(),
            SessionEvent::Registration(RegistrationStatus::InProgress)
        );
        assert!(matches!(
            rx.blocking_recv().unwrap(),
            SessionEvent::Registration(RegistrationStatus::Registered(_))
        ));
    }

    fn finish(mut self) {
        let _ = self.command_tx.send(HostCommand::Exit);
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

#[test]
fn test_register_passes_through_in_progress_before_registered() {
    let (harness, mut rx) = Harness::start();

    harness.send(HostCommand::register("alice", "sip.example.com", "pw"));

    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Registration(RegistrationStatus::InProgress)
    );
    let SessionEvent::Registration(RegistrationStatus::Registered(info)) =
        rx.blocking_recv().unwrap()
    else {
        panic!("expected Registered after InProgress");
    };
    assert_eq!(info.username, "alice");
    assert_eq!(info.domain, "sip.example.com:5060");

    harness.finish();
}

#[test]
fn test_invalid_register_is_refused_without_events_or_engine_mutation() {
    let (harness, mut rx) = Harness::start();

    harness.send(HostCommand::register("", "sip.example.com", "pw"));
    // Fence: the next command's event is the first thing published.
    harness.send(HostCommand::RequestCallState);

    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Call(CallStatus::Idle)
    );
    let inner = harness.inner.lock();
    assert_eq!(inner.auth_count, 0);
    assert_eq!(inner.account_count, 0);
    assert_eq!(inner.start_count, 0);
    drop(inner);

    harness.finish();
}

#[test]
fn test_request_registration_state_is_at_least_once() {
    let (harness, mut rx) = Harness::start();
    harness.register(&mut rx);

    harness.send(HostCommand::RequestRegistrationState);
    harness.send(HostCommand::RequestRegistrationState);

    let first = rx.blocking_recv().unwrap();
    let second = rx.blocking_recv().unwrap();
    assert_eq!(first, second);
    assert!(matches!(
        first,
        SessionEvent::Registration(RegistrationStatus::Registered(_))
    ));

    harness.finish();
}

#[test]
fn test_late_subscriber_sees_fresh_snapshot_not_replay() {
    let (harness, mut rx1) = Harness::start();
    harness.register(&mut rx1);

    // Subscribed after Registered was published: no history.
    let mut rx2 = harness.events.subscribe();
    harness.send(HostCommand::RequestRegistrationState);

    let SessionEvent::Registration(RegistrationStatus::Registered(info)) =
        rx2.blocking_recv().unwrap()
    else {
        panic!("expected exactly one fresh Registered event");
    };
    assert_eq!(info.username, "alice");
    assert!(matches!(rx2.try_recv(), Err(TryRecvError::Empty)));

    harness.finish();
}

#[test]
fn test_terminate_without_call_produces_no_event() {
    let (harness, mut rx) = Harness::start();

    harness.send(HostCommand::TerminateCall);
    harness.send(HostCommand::RequestRegistrationState);

    // No Call event precedes the fence.
    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Registration(RegistrationStatus::Unregistered)
    );

    harness.finish();
}

#[test]
fn test_incoming_call_announced_once_and_terminated() {
    let (harness, mut rx) = Harness::start();
    harness.register(&mut rx);

    harness.ring(1, "sip:bob@sip.example.com");
    // The engine repeats the callback for the same handle.
    harness.ring(1, "sip:bob@sip.example.com");

    for _ in 0..2 {
        let SessionEvent::Call(CallStatus::IncomingReceived(info)) = rx.blocking_recv().unwrap()
        else {
            panic!("expected IncomingReceived");
        };
        assert_eq!(info.id, CallId(1));
    }
    assert_eq!(harness.incoming_count.load(Ordering::SeqCst), 1);

    harness.send(HostCommand::TerminateCall);
    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Call(CallStatus::Released)
    );

    harness.finish();
}

#[test]
fn test_replaced_call_releases_previous_handle_first() {
    let (harness, mut rx) = Harness::start();
    harness.register(&mut rx);

    harness.ring(1, "sip:bob@sip.example.com");
    assert!(matches!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Call(CallStatus::IncomingReceived(_))
    ));

    harness.ring(2, "sip:carol@sip.example.com");
    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Call(CallStatus::Released)
    );
    let SessionEvent::Call(CallStatus::IncomingReceived(info)) = rx.blocking_recv().unwrap()
    else {
        panic!("expected IncomingReceived for the new handle");
    };
    assert_eq!(info.id, CallId(2));
    assert_eq!(harness.incoming_count.load(Ordering::SeqCst), 2);

    harness.finish();
}

#[test]
fn test_exit_shuts_down_once_and_accepts_no_further_commands() {
    let (mut harness, mut rx) = Harness::start();
    harness.register(&mut rx);

    harness.send(HostCommand::Exit);
    harness.thread.take().unwrap().join().unwrap();

    // Teardown published the final unregistered state.
    assert_eq!(
        rx.blocking_recv().unwrap(),
        SessionEvent::Registration(RegistrationStatus::Unregistered)
    );

    let inner = harness.inner.lock();
    assert_eq!(inner.clear_accounts_count, 1);
    assert_eq!(inner.clear_auth_count, 1);
    assert_eq!(inner.detach_count, 1);
    assert_eq!(inner.stop_count, 1);
    drop(inner);

    // The host is gone; commands are no longer accepted.
    assert!(harness
        .command_tx
        .send(HostCommand::RequestCallState)
        .is_err());
    let inner = harness.inner.lock();
    assert_eq!(inner.stop_count, 1);
    drop(inner);
}

#[test]
fn test_command_channel_disconnect_shuts_down() {
    let (mut harness, _rx) = Harness::start();

    drop(harness.command_tx);
    harness.thread.take().unwrap().join().unwrap();

    let inner = harness.inner.lock();
    assert_eq!(inner.stop_count, 1);
    assert_eq!(inner.clear_accounts_count, 1);
}
