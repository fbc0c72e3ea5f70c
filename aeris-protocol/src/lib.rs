//! Aeris wire formats
//!
//! Everything the node puts on (or takes off) the network above the MQTT
//! layer, as pure encode/decode functions with no I/O:
//!
//! - [`payload`]: JSON bodies for the `weather` and `message` topics
//! - [`sntp`]: SNTP v3 client request and server response
//!
//! MQTT framing itself is handled by `rust-mqtt` in `aeris-core`.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod payload;
pub mod sntp;

pub use payload::{DisplayMessage, PayloadError, Telemetry, MAX_TELEMETRY_LEN};
pub use sntp::SntpError;
