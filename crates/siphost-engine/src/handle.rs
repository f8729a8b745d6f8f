//! Ownership of the external engine: configuration, start, teardown.

use crossbeam_channel::Sender;
use tracing::{debug, info, instrument, warn};
use url::Url;

use siphost_ipc::{CallId, Credentials, Domain};

use crate::engine::{
    AccountParams, AccountSnapshot, AuthInfo, CallSnapshot, EngineNotification, SipEngine,
};
use crate::error::EngineError;

/// Owns the external SIP engine and exposes the narrow command
/// surface the host needs: register, snapshot reads, terminate,
/// shutdown.
pub struct EngineHandle {
    engine: Box<dyn SipEngine>,
    notification_tx: Sender<EngineNotification>,
    listener_attached: bool,
}

impl EngineHandle {
    /// Create a handle around an engine. Raw notifications will be
    /// forwarded through `notification_tx` once a registration attaches
    /// the listener.
    pub fn new(engine: Box<dyn SipEngine>, notification_tx: Sender<EngineNotification>) -> Self {
        Self {
            engine,
            notification_tx,
            listener_attached: false,
        }
    }

    /// Register an account and start the engine.
    ///
    /// Input is validated before the engine is touched: empty username
    /// or host and unparsable addresses are refused here. The
    /// notification listener is attached exactly once, on the first
    /// successful registration; later registrations mutate the
    /// account set in place.
    #[instrument(name = "engine_start", skip(self, credentials))]
    pub fn start(&mut self, credentials: &Credentials, domain: &Domain) -> Result<(), EngineError> {
        if credentials.login.is_empty() {
            return Err(EngineError::MissingCredentials("username"));
        }
        if domain.host.is_empty() {
            return Err(EngineError::MissingCredentials("host"));
        }

        let server = domain.server_uri();
        Url::parse(&server).map_err(|_| EngineError::AddressInvalid(server.clone()))?;
        let identity = format!("sip:{}@{}", credentials.login, domain.authority());
        Url::parse(&identity).map_err(|_| EngineError::AddressInvalid(identity.clone()))?;

        self.engine.add_auth(AuthInfo {
            username: credentials.login.clone(),
            password: credentials.password.clone(),
            realm: domain.authority(),
        })?;
        self.engine.add_account(AccountParams {
            identity,
            server,
            register: true,
        })?;

        if !self.listener_attached {
            self.engine.attach_listener(self.notification_tx.clone());
            self.listener_attached = true;
        }

        self.engine.start()?;
        info!(host = %domain.host, "engine started");
        Ok(())
    }

    /// Snapshot of the default account. Never triggers network activity.
    pub fn current_account(&self) -> Option<AccountSnapshot> {
        self.engine.default_account()
    }

    /// Snapshot of the current call. Never triggers network activity.
    pub fn current_call(&self) -> Option<CallSnapshot> {
        self.engine.current_call()
    }

    /// Request termination of a call. Idempotent: a call that is
    /// already released is a no-op.
    pub fn terminate(&mut self, id: CallId) {
        match self.engine.terminate_call(id) {
            Ok(()) => debug!(%id, "terminate requested"),
            Err(EngineError::AlreadyReleased(_)) => debug!(%id, "call already released"),
            Err(e) => warn!(%id, error = %e, "terminate failed"),
        }
    }

    /// Tear the engine down: clear accounts, clear stored auth,
    /// detach the listener, stop the engine.
    ///
    /// Safe to call if `start` was never invoked or partially failed.
    /// Each step is guarded independently so one failure does not
    /// prevent the remaining steps from executing.
    #[instrument(name = "engine_shutdown", skip(self))]
    pub fn shutdown(&mut self) {
        if let Err(e) = self.engine.clear_accounts() {
            warn!(error = %e, "failed to clear accounts");
        }
        if let Err(e) = self.engine.clear_auth() {
            warn!(error = %e, "failed to clear auth records");
        }
        if self.listener_attached {
            self.engine.detach_listener();
            self.listener_attached = false;
        }
        if let Err(e) = self.engine.stop() {
            warn!(error = %e, "failed to stop engine");
        }
        info!("engine shut down");
    }
}
