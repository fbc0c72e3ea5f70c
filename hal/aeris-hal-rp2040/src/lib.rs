//! RP2040-specific HAL for the sensor node
//!
//! This crate provides RP2040 implementations of the shared `aeris-hal`
//! and `aeris-core` traits:
//!
//! - Flash storage driver for the credentials partition
//!   (implements `aeris_hal::FlashStorage`)
//! - Watchdog-free system reset (implements `aeris_core::traits::Reboot`)

#![no_std]

pub mod flash;
pub mod reset;

// Re-export shared traits from aeris-hal for convenience
pub use aeris_hal::{FlashStorage as FlashStorageTrait, StorageKey};
pub use flash::Rp2040FlashStorage;
pub use reset::SystemReset;
