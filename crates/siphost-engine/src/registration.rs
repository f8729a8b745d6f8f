//! Registration state machine.

use tracing::debug;

use siphost_ipc::{AccountInfo, RegistrationStatus};

use crate::engine::{AccountSnapshot, RawRegistrationState};

/// Derives a typed [`RegistrationStatus`] from raw engine callbacks.
///
/// The machine republishes on every callback, including repeats:
/// callers rely on receiving a fresh event after every request-state
/// command even when the value is unchanged.
pub struct RegistrationMachine {
    status: RegistrationStatus,
}

impl RegistrationMachine {
    pub fn new() -> Self {
        Self {
            status: RegistrationStatus::Unregistered,
        }
    }

    /// The last derived status.
    pub fn status(&self) -> &RegistrationStatus {
        &self.status
    }

    /// Apply a raw registration callback and return the new status.
    pub fn on_notification(
        &mut self,
        account: Option<&AccountSnapshot>,
        state: Option<RawRegistrationState>,
        message: &str,
    ) -> RegistrationStatus {
        let next = derive(account, state, message);
        if next.name() != self.status.name() {
            debug!(
                previous = self.status.name(),
                current = next.name(),
                "registration transition"
            );
        }
        self.status = next.clone();
        next
    }

    /// Map an account snapshot to a status without mutating the
    /// machine. Serves the request-state shortcut.
    pub fn snapshot(account: Option<&AccountSnapshot>) -> RegistrationStatus {
        match account {
            None => RegistrationStatus::Unregistered,
            Some(a) => derive(Some(a), Some(a.state), ""),
        }
    }
}

impl Default for RegistrationMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn derive(
    account: Option<&AccountSnapshot>,
    state: Option<RawRegistrationState>,
    message: &str,
) -> RegistrationStatus {
    let Some(account) = account else {
        return RegistrationStatus::Unregistered;
    };
    match state {
        None | Some(RawRegistrationState::Cleared) => RegistrationStatus::Unregistered,
        Some(RawRegistrationState::Progress) => RegistrationStatus::InProgress,
        Some(RawRegistrationState::Ok) => RegistrationStatus::Registered(AccountInfo {
            username: account.username.clone(),
            domain: account.domain.clone(),
        }),
        Some(RawRegistrationState::Failed) => RegistrationStatus::Failed {
            reason: if message.is_empty() {
                "registration failed".to_string()
            } else {
                message.to_string()
            },
        },
    }
}
