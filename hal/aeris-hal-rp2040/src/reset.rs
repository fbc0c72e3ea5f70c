//! Device restart

use aeris_core::traits::Reboot;

/// Full chip reset through the Cortex-M0+ AIRCR register
///
/// Equivalent to a power cycle for the firmware: RAM state, the radio and
/// the IP stack all start over.
#[derive(Debug, Default)]
pub struct SystemReset;

impl Reboot for SystemReset {
    fn restart(&mut self) -> ! {
        #[cfg(feature = "defmt")]
        defmt::warn!("restarting device");
        cortex_m::peripheral::SCB::sys_reset()
    }
}
