//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 ┌─────────────────┐
//!                 │     Loading     │ (initial)
//!                 └────────┬────────┘
//!          ProfileLoaded   │   ProbeRejected / SessionRevoked / LogoutCompleted
//!          ┌───────────────┴───────────────┐
//!          ▼                               ▼
//! ┌─────────────────┐  ProbeRejected  ┌─────────────────┐
//! │  Authenticated  │ ──────────────► │    Anonymous    │
//! │                 │ SessionRevoked  │                 │
//! │                 │ LogoutCompleted │                 │
//! │                 │ ◄────────────── │                 │
//! └─────────────────┘  ProfileLoaded  └─────────────────┘
//! ```
//!
//! No input leads back to `Loading`. Settled states accept every input so
//! that overlapping probes can land in any order; the last write wins.

use crate::UserProfile;
use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Loading)

    Loading => {
        ProfileLoaded => Authenticated,
        ProbeRejected => Anonymous,
        SessionRevoked => Anonymous,
        LogoutCompleted => Anonymous
    },
    Authenticated => {
        ProfileLoaded => Authenticated,
        ProbeRejected => Anonymous,
        SessionRevoked => Anonymous,
        LogoutCompleted => Anonymous
    },
    Anonymous => {
        ProfileLoaded => Authenticated,
        ProbeRejected => Anonymous,
        SessionRevoked => Anonymous,
        LogoutCompleted => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Observable session state.
///
/// Owned by the auth state machine; everyone else gets a read-only view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "user", rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Authenticated(UserProfile),
    Anonymous,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    /// The FSM state this value corresponds to.
    pub fn machine_state(&self) -> SessionMachineState {
        match self {
            SessionState::Loading => SessionMachineState::Loading,
            SessionState::Authenticated(_) => SessionMachineState::Authenticated,
            SessionState::Anonymous => SessionMachineState::Anonymous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_INPUTS: [SessionMachineInput; 4] = [
        SessionMachineInput::ProfileLoaded,
        SessionMachineInput::ProbeRejected,
        SessionMachineInput::SessionRevoked,
        SessionMachineInput::LogoutCompleted,
    ];

    #[test]
    fn test_initial_state_is_loading() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Loading);
    }

    #[test]
    fn test_profile_loaded_authenticates() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::ProfileLoaded).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_probe_rejected_goes_anonymous() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::ProbeRejected).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Anonymous);
    }

    #[test]
    fn test_logout_and_revocation_from_authenticated() {
        for input in [
            SessionMachineInput::SessionRevoked,
            SessionMachineInput::LogoutCompleted,
            SessionMachineInput::ProbeRejected,
        ] {
            let mut machine = SessionMachine::new();
            machine.consume(&SessionMachineInput::ProfileLoaded).unwrap();
            machine.consume(&input).unwrap();
            assert_eq!(*machine.state(), SessionMachineState::Anonymous);
        }
    }

    #[test]
    fn test_login_after_anonymous() {
        let mut machine = SessionMachine::new();
        machine.consume(&SessionMachineInput::LogoutCompleted).unwrap();
        machine.consume(&SessionMachineInput::ProfileLoaded).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn test_never_returns_to_loading() {
        let mut machine = SessionMachine::new();
        for first in ALL_INPUTS.iter() {
            for second in ALL_INPUTS.iter() {
                machine.consume(first).unwrap();
                machine.consume(second).unwrap();
                assert_ne!(*machine.state(), SessionMachineState::Loading);
            }
        }
    }

    #[test]
    fn test_session_state_helpers() {
        let profile = UserProfile::with_id("42");
        let state = SessionState::Authenticated(profile.clone());
        assert!(state.is_authenticated());
        assert_eq!(state.user(), Some(&profile));
        assert_eq!(state.machine_state(), SessionMachineState::Authenticated);

        assert!(SessionState::Loading.is_loading());
        assert!(SessionState::Anonymous.user().is_none());
        assert_eq!(
            SessionState::Anonymous.machine_state(),
            SessionMachineState::Anonymous
        );
    }

    #[test]
    fn test_session_state_serialization() {
        let json = serde_json::to_value(SessionState::Anonymous).unwrap();
        assert_eq!(json, serde_json::json!({"status": "anonymous"}));

        let json = serde_json::to_value(SessionState::Authenticated(UserProfile::with_id("7"))).unwrap();
        assert_eq!(json["status"], "authenticated");
        assert_eq!(json["user"]["id"], "7");
    }
}
