//! Display content model
//!
//! [`DisplayState`] holds what the OLED should show; [`layout`] turns
//! free-form text into fixed 16-column rows and picks row positions.

pub mod layout;
pub mod state;

pub use layout::{body_offset, fit, Align, Line, COLUMNS};
pub use state::DisplayState;
