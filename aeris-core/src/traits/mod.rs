//! Collaborator traits
//!
//! These traits define the interface between the node logic and the
//! board: radio, clock, sensor, display, secure transport and reset.
//! Timed pauses use `embedded_hal_async::delay::DelayNs` directly.

pub mod clock;
pub mod display;
pub mod network;
pub mod sensor;
pub mod system;
pub mod transport;

pub use clock::{unix_time, Clock, ClockError, EPOCH_OFFSET_SECS};
pub use display::{DisplayError, TextDisplay};
pub use network::{LinkError, NetworkLink};
pub use sensor::{Hygrometer, SensorError};
pub use system::Reboot;
pub use transport::{Transport, TransportError};
