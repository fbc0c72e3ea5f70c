//! Broker session
//!
//! [`SessionManager`] drives one MQTT session over a [`crate::traits::Transport`];
//! [`SessionState`] is the state machine it moves through.

pub mod manager;
pub mod state;
mod wire;

pub use manager::{ConnectError, PollError, PublishError, SessionManager, MQTT_BUFFER_LEN};
pub use state::{FailureKind, SessionEvent, SessionState};
