//! Board-agnostic core logic for the Aeris sensor node
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Collaborator traits (link, clock, sensor, display, transport, reboot)
//! - Display content model and 16-column text layout
//! - TLS credential loading
//! - MQTT session state machine and manager
//! - Publish rate gate
//! - Remote display commands
//! - The node orchestrator tying it all together

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod command;
pub mod config;
pub mod credentials;
pub mod display;
pub mod gate;
pub mod node;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

pub use command::{Command, DecodeError};
pub use config::{BrokerConfig, ConfigError, NodeConfig};
pub use credentials::{CredentialError, Credentials};
pub use display::DisplayState;
pub use gate::PublishGate;
pub use node::{BootError, Node, SensorReading, Step};
pub use session::{SessionManager, SessionState};
