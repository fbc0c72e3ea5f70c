//! Temperature / humidity sensor trait

/// Errors that can occur while measuring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Sensor did not answer the start signal
    NoResponse,
    /// Bit timing outside the protocol window
    Timeout,
    /// Frame checksum mismatch
    Checksum,
    /// Pin access failed
    Bus,
}

/// Combined temperature and relative humidity sensor
///
/// `measure` refreshes both values; the getters return the most recent
/// successful measurement, so a failed `measure` leaves them unchanged.
pub trait Hygrometer {
    /// Take a new measurement
    ///
    /// Implementations may retry internally before reporting an error.
    fn measure(&mut self) -> impl core::future::Future<Output = Result<(), SensorError>>;

    /// Last measured temperature in °C
    fn temperature(&self) -> f32;

    /// Last measured relative humidity in %
    fn humidity(&self) -> f32;
}
