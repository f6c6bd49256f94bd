//! Client-side authentication state for the TechInsights client.
//!
//! This crate provides:
//! - An explicit FSM (`Loading`, `Authenticated`, `Anonymous`) built with rust-fsm
//! - Profile normalization for the various shapes of the "who am I" response
//! - [`AuthStateMachine`]: mount probe with one delayed retry, revalidation on
//!   viewport events, login redirect, fail-open logout, nickname updates

mod auth_fsm;
mod error;
mod machine;
mod profile;

pub use auth_fsm::session_machine;
pub use auth_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionState};
pub use error::{AuthError, AuthResult};
pub use machine::{
    AuthStateMachine, ViewportEvent, LOGIN_PATH, NICKNAME_MAX_CHARS, NICKNAME_MIN_CHARS,
    NICKNAME_PATH,
};
pub use profile::{normalize_profile, UserProfile};
