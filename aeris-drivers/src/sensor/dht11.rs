//! DHT11 temperature and humidity sensor
//!
//! Single-wire protocol: the host pulls the line low for at least 18 ms,
//! releases it, and the sensor answers with an 80 us low / 80 us high
//! preamble followed by 40 bits. Each bit is a ~50 us low followed by a high
//! pulse of ~27 us (0) or ~70 us (1). The frame is humidity (integer,
//! decimal), temperature (integer, decimal with sign bit) and a checksum.

use aeris_core::traits::{Hygrometer, SensorError};
use embedded_hal::digital::{InputPin, OutputPin};

/// Raw 40-bit frame
pub type Frame = [u8; 5];

/// Measurement attempts per `measure` call
pub const MAX_ATTEMPTS: u8 = 3;

/// Host start pulse
const START_LOW_MS: u32 = 20;
/// Longest level the sensor may hold during a frame
const LEVEL_TIMEOUT_US: u32 = 100;
/// High pulses longer than this are a 1 bit
const ONE_THRESHOLD_US: u32 = 40;

/// Source of raw DHT11 frames
pub trait Dht11Bus {
    /// Perform one start/response exchange and return the frame as sent
    fn read_frame(&mut self) -> impl core::future::Future<Output = Result<Frame, SensorError>>;
}

/// Validate the checksum and convert to (°C, %RH)
pub fn decode_frame(frame: Frame) -> Result<(f32, f32), SensorError> {
    let [hum_int, hum_dec, temp_int, temp_dec, checksum] = frame;
    let sum = hum_int
        .wrapping_add(hum_dec)
        .wrapping_add(temp_int)
        .wrapping_add(temp_dec);
    if sum != checksum {
        return Err(SensorError::Checksum);
    }

    let humidity = hum_int as f32 + hum_dec as f32 * 0.1;
    let magnitude = temp_int as f32 + (temp_dec & 0x7F) as f32 * 0.1;
    let temperature = if temp_dec & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };
    Ok((temperature, humidity))
}

/// Bit-banged bus on an open-drain GPIO
///
/// `set_high` must release the line (external or internal pull-up). Bit
/// timing is measured by busy-polling with 1 us blocking delays, so long
/// interrupt handlers during a read show up as checksum or timeout errors.
pub struct PinBus<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> PinBus<P, D>
where
    P: InputPin + OutputPin,
    D: embedded_hal::delay::DelayNs + embedded_hal_async::delay::DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    /// Microseconds spent before the line leaves `high`
    fn wait_while(&mut self, high: bool) -> Result<u32, SensorError> {
        let mut elapsed = 0;
        loop {
            let level = self.pin.is_high().map_err(|_| SensorError::Bus)?;
            if level != high {
                return Ok(elapsed);
            }
            if elapsed >= LEVEL_TIMEOUT_US {
                return Err(SensorError::Timeout);
            }
            embedded_hal::delay::DelayNs::delay_us(&mut self.delay, 1);
            elapsed += 1;
        }
    }

    fn read_bits(&mut self) -> Result<Frame, SensorError> {
        // Response preamble
        self.wait_while(true)
            .map_err(|_| SensorError::NoResponse)?;
        self.wait_while(false)?;
        self.wait_while(true)?;

        let mut frame = [0u8; 5];
        for byte in frame.iter_mut() {
            for _ in 0..8 {
                self.wait_while(false)?;
                let high_us = self.wait_while(true)?;
                *byte = (*byte << 1) | u8::from(high_us > ONE_THRESHOLD_US);
            }
        }
        Ok(frame)
    }
}

impl<P, D> Dht11Bus for PinBus<P, D>
where
    P: InputPin + OutputPin,
    D: embedded_hal::delay::DelayNs + embedded_hal_async::delay::DelayNs,
{
    async fn read_frame(&mut self) -> Result<Frame, SensorError> {
        self.pin.set_low().map_err(|_| SensorError::Bus)?;
        embedded_hal_async::delay::DelayNs::delay_ms(&mut self.delay, START_LOW_MS).await;
        self.pin.set_high().map_err(|_| SensorError::Bus)?;

        let result = self.read_bits();
        // Leave the line released for the next start pulse
        let _ = self.pin.set_high();
        result
    }
}

/// DHT11 hygrometer with cached last-good values
pub struct Dht11<B> {
    bus: B,
    temperature: f32,
    humidity: f32,
}

impl<B: Dht11Bus> Dht11<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            temperature: 0.0,
            humidity: 0.0,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: Dht11Bus> Hygrometer for Dht11<B> {
    /// Read a frame, retrying up to [`MAX_ATTEMPTS`] times
    ///
    /// On failure the previous values are kept.
    async fn measure(&mut self) -> Result<(), SensorError> {
        let mut last_error = SensorError::NoResponse;
        for _ in 0..MAX_ATTEMPTS {
            match self.bus.read_frame().await.and_then(decode_frame) {
                Ok((temperature, humidity)) => {
                    self.temperature = temperature;
                    self.humidity = humidity;
                    return Ok(());
                }
                Err(e) => last_error = e,
            }
        }
        Err(last_error)
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn humidity(&self) -> f32 {
        self.humidity
    }
}
