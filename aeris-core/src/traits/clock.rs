//! Wall-clock trait

/// Seconds from the Unix epoch to the device epoch (2000-01-01T00:00:00Z)
pub const EPOCH_OFFSET_SECS: u64 = 946_684_800;

/// Errors from time synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Time server name did not resolve or no route
    Unreachable,
    /// No reply in time
    Timeout,
    /// Reply failed validation
    InvalidResponse,
}

/// Seconds counter anchored at the device epoch
///
/// Before [`Clock::sync`] succeeds the counter starts from whatever the
/// board considers its power-on time.
pub trait Clock {
    /// Seconds since 2000-01-01
    fn now(&self) -> u64;

    /// Set the counter from a network time source
    fn sync(&mut self) -> impl core::future::Future<Output = Result<(), ClockError>>;
}

/// Convert a device-epoch reading to Unix seconds
pub fn unix_time(device_secs: u64) -> u64 {
    device_secs.saturating_add(EPOCH_OFFSET_SECS)
}
