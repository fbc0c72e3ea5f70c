//! Aeris hardware abstraction
//!
//! Chip-independent traits that the board HALs implement. `aeris-core`
//! talks only to these, which keeps credential loading testable on the
//! host against an in-memory store.
//!
//! ```text
//!   aeris-core ──► aeris-hal (traits) ◄── aeris-hal-rp2040
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod flash;

pub use flash::{FlashError, FlashStorage, StorageKey};
