//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in aeris-core for the node's peripherals:
//!
//! - SSD1306 128x64 OLED over I2C ([`display::Ssd1306`])
//! - DHT11 temperature/humidity sensor on a single data line ([`sensor::Dht11`])

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod display;
pub mod sensor;
