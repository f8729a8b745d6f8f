//! Events broadcast from the session host to presentation surfaces.

use serde::{Deserialize, Serialize};

use crate::status::{CallStatus, RegistrationStatus};

/// One broadcast event. Immutable once published; the host publishes
/// every detected transition individually, in detection order, and
/// never coalesces repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// The registration status changed or was republished on request.
    Registration(RegistrationStatus),

    /// The call status changed or was republished on request.
    Call(CallStatus),
}
