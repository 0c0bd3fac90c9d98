//! Session lifecycle state machine.
//!
//! Only the session controller moves a session between states; every
//! transition is validated and returns `Result` instead of panicking.

use crate::error::SessionError;

// ── SessionState ─────────────────────────────────────────────────

/// Where a session is in its lifecycle.
///
/// ```text
///  Idle ─► Validating ─► AwaitingSlot ─► ControlPlaneLaunching ─► EngineStarting ─► Active
///              │               │                  │                      │             │
///              └───────────────┴──────────────────┴──────────┬───────────┘             ▼
///                                                            ▼                    Terminating
///                                                         Cleaned ◄────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SessionState {
    #[default]
    Idle,

    /// Checking the request against host capabilities.
    Validating,

    /// Waiting for the process-wide session lease.
    AwaitingSlot,

    /// Launch or resume request in flight.
    ControlPlaneLaunching,

    /// The streaming engine is being brought up.
    EngineStarting,

    /// Streaming; the session thread is pumping events.
    Active,

    /// Decoder destroyed; deferred cleanup in progress.
    Terminating,

    /// Terminal.
    Cleaned,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "Idle",
            Self::Validating => "Validating",
            Self::AwaitingSlot => "AwaitingSlot",
            Self::ControlPlaneLaunching => "ControlPlaneLaunching",
            Self::EngineStarting => "EngineStarting",
            Self::Active => "Active",
            Self::Terminating => "Terminating",
            Self::Cleaned => "Cleaned",
        };
        f.write_str(name)
    }
}

impl SessionState {
    /// Whether the session holds (or is about to release) the lease.
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            Self::ControlPlaneLaunching | Self::EngineStarting | Self::Active | Self::Terminating
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cleaned)
    }

    fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, AwaitingSlot)
                | (AwaitingSlot, ControlPlaneLaunching)
                | (ControlPlaneLaunching, EngineStarting)
                | (EngineStarting, Active)
                | (Active, Terminating)
                | (Terminating, Cleaned)
                // Aborts before the engine is streaming clean up synchronously.
                | (Validating | AwaitingSlot | ControlPlaneLaunching | EngineStarting, Cleaned)
        )
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Move to `next`.
    pub fn advance(&mut self, next: SessionState) -> Result<(), SessionError> {
        if self.can_transition_to(next) {
            *self = next;
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: *self,
                to: next,
            })
        }
    }
}
