//! The session host: command dispatch and event publication.

use crossbeam_channel::{select, Receiver};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

use siphost_ipc::{
    validate_registration, CallInfo, Credentials, Domain, HostCommand, RegistrationStatus,
    SessionEvent,
};

use crate::call::CallMachine;
use crate::engine::{EngineNotification, SipEngine};
use crate::handle::EngineHandle;
use crate::registration::RegistrationMachine;

/// Presentation collaborator notified when an incoming call should
/// bring up an interaction surface. Called exactly once per distinct
/// call handle, from the host's sequencing thread.
pub trait IncomingCallObserver: Send {
    fn on_incoming_call(&self, call: &CallInfo);
}

/// The single sequencing point of the system.
///
/// Commands from any number of presentation surfaces and raw
/// notifications from the engine's own thread are both funneled into
/// one loop, so engine state is never read mid-update and concurrent
/// commands apply in an order, never interleaved partially. Commands
/// return nothing; all results surface on the broadcast channel.
pub struct SessionHost {
    command_rx: Receiver<HostCommand>,
    notification_rx: Receiver<EngineNotification>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: EngineHandle,
    registration: RegistrationMachine,
    calls: CallMachine,
    observer: Box<dyn IncomingCallObserver>,
    shut_down: bool,
}

impl SessionHost {
    /// Create a host around an engine.
    pub fn new(
        engine: Box<dyn SipEngine>,
        command_rx: Receiver<HostCommand>,
        event_tx: broadcast::Sender<SessionEvent>,
        observer: Box<dyn IncomingCallObserver>,
    ) -> Self {
        let (notification_tx, notification_rx) = crossbeam_channel::unbounded();
        Self {
            command_rx,
            notification_rx,
            event_tx,
            handle: EngineHandle::new(engine, notification_tx),
            registration: RegistrationMachine::new(),
            calls: CallMachine::new(),
            observer,
            shut_down: false,
        }
    }

    /// Run the host loop (blocking). Returns after `Exit` or when the
    /// command channel disconnects; the engine is shut down either way.
    #[instrument(name = "host_run", skip(self))]
    pub fn run(&mut self) {
        info!("session host starting");

        let command_rx = self.command_rx.clone();
        let notification_rx = self.notification_rx.clone();
        loop {
            select! {
                recv(command_rx) -> msg => match msg {
                    Ok(command) => {
                        if !self.handle_command(command) {
                            break;
                        }
                    }
                    Err(_) => {
                        info!("command channel disconnected, shutting down");
                        break;
                    }
                },
                recv(notification_rx) -> msg => {
                    // The sender half lives in the engine handle, so
                    // this arm only ever sees Ok.
                    if let Ok(notification) = msg {
                        self.handle_notification(notification);
                    }
                }
            }
        }

        self.shutdown();
        info!("session host stopped");
    }

    /// Handle a command. Returns false if the host should stop.
    fn handle_command(&mut self, command: HostCommand) -> bool {
        debug!(command = command.name(), "handling command");

        match command {
            HostCommand::Register {
                username,
                host,
                password,
                port,
            } => self.register(username, host, password, port),
            HostCommand::RequestRegistrationState => self.publish_registration_state(),
            HostCommand::RequestCallState => self.publish_call_state(),
            HostCommand::TerminateCall => self.terminate_current_call(),
            HostCommand::Exit => {
                self.shutdown();
                return false;
            }
        }

        true
    }

    /// Register an account. Invalid input is refused here, before any
    /// engine mutation and without producing broadcast events; errors
    /// the engine reports later arrive as registration notifications.
    #[instrument(name = "register", skip(self, username, password))]
    fn register(&mut self, username: String, host: String, password: String, port: u16) {
        if let Err(e) = validate_registration(&username, &host) {
            warn!(error = %e, "refusing register command");
            return;
        }

        let credentials = Credentials {
            login: username,
            password,
        };
        let domain = Domain {
            host,
            port: Some(port),
        };
        match self.handle.start(&credentials, &domain) {
            Ok(()) => {}
            Err(e) if e.is_validation() => {
                warn!(error = %e, "refusing register command");
            }
            Err(e) => {
                error!(error = %e, "engine start failed");
                self.publish(SessionEvent::Registration(RegistrationStatus::Failed {
                    reason: e.to_string(),
                }));
            }
        }
    }

    /// Publish a fresh registration event from the engine snapshot,
    /// without waiting for a spontaneous callback.
    fn publish_registration_state(&mut self) {
        let account = self.handle.current_account();
        let status = RegistrationMachine::snapshot(account.as_ref());
        self.publish(SessionEvent::Registration(status));
    }

    /// Publish a fresh call event from the engine snapshot.
    fn publish_call_state(&mut self) {
        let call = self.handle.current_call();
        let status = CallMachine::snapshot(call.as_ref());
        self.publish(SessionEvent::Call(status));
    }

    fn terminate_current_call(&mut self) {
        match self.handle.current_call() {
            Some(call) => self.handle.terminate(call.id),
            None => debug!("terminate requested with no current call"),
        }
    }

    fn handle_notification(&mut self, notification: EngineNotification) {
        match notification {
            EngineNotification::Registration {
                account,
                state,
                message,
            } => {
                let status = self
                    .registration
                    .on_notification(account.as_ref(), state, &message);
                self.publish(SessionEvent::Registration(status));
            }
            EngineNotification::Call { call } => {
                let transition = self.calls.on_notification(&call);
                if let Some(info) = &transition.incoming {
                    self.observer.on_incoming_call(info);
                }
                for status in transition.events {
                    self.publish(SessionEvent::Call(status));
                }
            }
        }
    }

    /// Tear down the engine and publish the final unregistered state.
    /// Idempotent; a second call has no further side effects.
    fn shutdown(&mut self) {
        if self.shut_down {
            debug!("already shut down");
            return;
        }
        self.shut_down = true;

        info!("session host shutting down");
        self.handle.shutdown();
        self.publish(SessionEvent::Registration(RegistrationStatus::Unregistered));
    }

    /// Publish one event to all current subscribers. Never blocks;
    /// with no subscribers the event is simply dropped.
    fn publish(&self, event: SessionEvent) {
        if self.event_tx.send(event).is_err() {
            debug!("no active subscribers, event dropped");
        }
    }
}
