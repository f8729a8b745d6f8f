//! Call state machine.

use tracing::{debug, warn};

use siphost_ipc::{CallId, CallInfo, CallStatus};

use crate::engine::{CallSnapshot, RawCallState};

/// Outcome of applying one raw call callback.
pub struct CallTransition {
    /// Statuses to publish, in order.
    pub events: Vec<CallStatus>,

    /// Set exactly once per distinct incoming call handle; drives the
    /// presentation collaborator that brings up the call screen.
    pub incoming: Option<CallInfo>,
}

/// Derives a typed [`CallStatus`] from raw engine callbacks.
///
/// At most one call handle is current at any time. If the engine
/// reports a new handle without having released the previous one, a
/// `Released` event is synthesized first so subscribers never see two
/// live handles.
pub struct CallMachine {
    current: Option<CallId>,
    announced: Option<CallId>,
}

impl CallMachine {
    pub fn new() -> Self {
        Self {
            current: None,
            announced: None,
        }
    }

    /// The currently tracked call handle, if any.
    pub fn current(&self) -> Option<CallId> {
        self.current
    }

    /// Apply a raw call callback.
    pub fn on_notification(&mut self, call: &CallSnapshot) -> CallTransition {
        let mut events = Vec::with_capacity(2);
        let mut incoming = None;

        match call.state {
            RawCallState::Released => {
                if self.current == Some(call.id) {
                    self.current = None;
                } else if self.current.is_some() {
                    debug!(%call.id, "release for a call that is not current");
                }
                if self.announced == Some(call.id) {
                    self.announced = None;
                }
                events.push(CallStatus::Released);
            }
            state => {
                self.supersede(call.id, &mut events);
                let info = CallInfo {
                    id: call.id,
                    remote: call.remote.clone(),
                };
                let status = match state {
                    RawCallState::IncomingReceived => {
                        if self.announced != Some(call.id) {
                            self.announced = Some(call.id);
                            incoming = Some(info.clone());
                        }
                        CallStatus::IncomingReceived(info)
                    }
                    RawCallState::OutgoingInit => CallStatus::OutgoingInit(info),
                    RawCallState::StreamsRunning => CallStatus::StreamsRunning(info),
                    // Released handled in the outer match.
                    RawCallState::Released => CallStatus::Released,
                };
                events.push(status);
            }
        }

        CallTransition { events, incoming }
    }

    /// Map a call snapshot to a status without mutating the machine.
    /// Serves the request-state shortcut.
    pub fn snapshot(call: Option<&CallSnapshot>) -> CallStatus {
        let Some(call) = call else {
            return CallStatus::Idle;
        };
        let info = CallInfo {
            id: call.id,
            remote: call.remote.clone(),
        };
        match call.state {
            RawCallState::IncomingReceived => CallStatus::IncomingReceived(info),
            RawCallState::OutgoingInit => CallStatus::OutgoingInit(info),
            RawCallState::StreamsRunning => CallStatus::StreamsRunning(info),
            RawCallState::Released => CallStatus::Released,
        }
    }

    /// Track `id` as the current call, releasing a different live
    /// handle first if the engine never reported its release.
    fn supersede(&mut self, id: CallId, events: &mut Vec<CallStatus>) {
        if let Some(current) = self.current {
            if current != id {
                warn!(%current, new = %id, "call replaced without release");
                events.push(CallStatus::Released);
                if self.announced == Some(current) {
                    self.announced = None;
                }
            }
        }
        self.current = Some(id);
    }
}

impl Default for CallMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(id: u64, state: RawCallState) -> CallSnapshot {
        CallSnapshot {
            id: CallId(id),
            remote: "sip:bob@sip.example.com".to_string(),
            state,
        }
    }

    #[test]
    fn test_incoming_announced_once_per_handle() {
        let mut machine = CallMachine::new();
        let first = machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));
        assert!(first.incoming.is_some());
        assert_eq!(first.events.len(), 1);

        // Repeated callback for the same handle republishes the status
        // but does not announce again.
        let repeat = machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));
        assert!(repeat.incoming.is_none());
        assert_eq!(repeat.events.len(), 1);
    }

    #[test]
    fn test_release_clears_current_handle() {
        let mut machine = CallMachine::new();
        machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));
        assert_eq!(machine.current(), Some(CallId(1)));

        let released = machine.on_notification(&snapshot(1, RawCallState::Released));
        assert_eq!(released.events, vec![CallStatus::Released]);
        assert_eq!(machine.current(), None);

        // The same handle ringing again counts as a new announcement.
        let again = machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));
        assert!(again.incoming.is_some());
    }

    #[test]
    fn test_replacement_synthesizes_release() {
        let mut machine = CallMachine::new();
        machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));

        let transition = machine.on_notification(&snapshot(2, RawCallState::IncomingReceived));
        assert_eq!(transition.events.len(), 2);
        assert_eq!(transition.events[0], CallStatus::Released);
        assert!(matches!(
            transition.events[1],
            CallStatus::IncomingReceived(_)
        ));
        assert!(transition.incoming.is_some());
        assert_eq!(machine.current(), Some(CallId(2)));
    }

    #[test]
    fn test_streams_running_maps_one_to_one() {
        let mut machine = CallMachine::new();
        machine.on_notification(&snapshot(1, RawCallState::IncomingReceived));
        let transition = machine.on_notification(&snapshot(1, RawCallState::StreamsRunning));
        assert_eq!(transition.events.len(), 1);
        assert!(matches!(
            transition.events[0],
            CallStatus::StreamsRunning(_)
        ));
        assert!(transition.incoming.is_none());
    }

    #[test]
    fn test_snapshot_mapping() {
        assert_eq!(CallMachine::snapshot(None), CallStatus::Idle);
        let snap = snapshot(3, RawCallState::StreamsRunning);
        let CallStatus::StreamsRunning(info) = CallMachine::snapshot(Some(&snap)) else {
            panic!("expected StreamsRunning");
        };
        assert_eq!(info.id, CallId(3));
    }
}
