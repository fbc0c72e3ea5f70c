//! JSON message bodies exchanged with the broker.
//!
//! Outbound (`weather` topic):
//! ```json
//! {"temp":22.5,"hum":55.0,"timestamp":1700000000}
//! ```
//!
//! Inbound (`message` topic), every field optional:
//! ```json
//! {"line1":"Hello","line2":"","line3":"","center":true,"wait":true,"sleep_ms":2000}
//! ```

use serde::{Deserialize, Serialize};

/// Upper bound on an encoded [`Telemetry`] body
pub const MAX_TELEMETRY_LEN: usize = 96;

/// Errors from payload encoding or decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Output buffer too small for the encoded body
    BufferTooSmall,
    /// Body is not a JSON object of the expected shape
    Malformed,
}

/// One sensor sample as published
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Temperature in °C
    pub temp: f32,
    /// Relative humidity in %
    pub hum: f32,
    /// Unix seconds
    pub timestamp: u64,
}

impl Telemetry {
    /// Serialize into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, PayloadError> {
        serde_json_core::to_slice(self, buffer).map_err(|_| PayloadError::BufferTooSmall)
    }
}

/// Remote display instruction, as received
///
/// Fields are left optional here; defaults are applied by the consumer.
/// Line strings borrow from the receive buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMessage<'a> {
    #[serde(borrow)]
    pub line1: Option<&'a str>,
    #[serde(borrow)]
    pub line2: Option<&'a str>,
    #[serde(borrow)]
    pub line3: Option<&'a str>,
    pub center: Option<bool>,
    pub wait: Option<bool>,
    pub sleep_ms: Option<u32>,
}

impl<'a> DisplayMessage<'a> {
    /// Parse an inbound body
    ///
    /// A body with nothing but whitespace decodes to the all-absent message.
    pub fn decode(body: &'a [u8]) -> Result<Self, PayloadError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json_core::from_slice::<DisplayMessage<'a>>(body)
            .map(|(message, _)| message)
            .map_err(|_| PayloadError::Malformed)
    }
}
