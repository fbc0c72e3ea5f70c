//! Network-facing collaborators
//!
//! - [`wifi`]: CYW43 radio bring-up and the `NetworkLink` implementation
//! - [`sntp`]: wall-clock `Clock` synchronised over SNTP
//! - [`tls`]: mutually authenticated TLS `Transport` over embassy-net TCP

pub mod sntp;
pub mod tls;
pub mod wifi;

pub use sntp::SntpClock;
pub use tls::{TlsBuffers, TlsTransport};
pub use wifi::WifiLink;
