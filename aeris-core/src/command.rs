//! Remote display commands
//!
//! A command arrives as a JSON body on the subscribe topic, is decoded into
//! a [`Command`] with defaults filled in, and is then applied to the
//! [`DisplayState`].

use aeris_protocol::DisplayMessage;

use crate::display::{layout, Align, DisplayState, Line};

/// Pause after a waiting command when `sleep_ms` is absent
pub const DEFAULT_SLEEP_MS: u32 = 2000;

/// Errors from command decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Body is not a JSON object of the expected shape
    Malformed,
}

/// A validated display instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Lines, already cut to 16 characters
    pub lines: [Line; 3],
    pub center: bool,
    /// Hold the rendered command on screen for `sleep_ms`
    pub wait: bool,
    pub sleep_ms: u32,
}

impl Default for Command {
    fn default() -> Self {
        Self {
            lines: [Line::new(), Line::new(), Line::new()],
            center: false,
            wait: true,
            sleep_ms: DEFAULT_SLEEP_MS,
        }
    }
}

impl Command {
    /// Pause to take after rendering, if any
    pub fn pause_ms(&self) -> Option<u32> {
        self.wait.then_some(self.sleep_ms)
    }
}

/// Decode an inbound body
///
/// Missing fields take the [`Command::default`] values; an empty body is
/// the all-default command.
pub fn decode(payload: &[u8]) -> Result<Command, DecodeError> {
    let message = DisplayMessage::decode(payload).map_err(|_| DecodeError::Malformed)?;
    let defaults = Command::default();

    Ok(Command {
        lines: [
            truncated(message.line1),
            truncated(message.line2),
            truncated(message.line3),
        ],
        center: message.center.unwrap_or(defaults.center),
        wait: message.wait.unwrap_or(defaults.wait),
        sleep_ms: message.sleep_ms.unwrap_or(defaults.sleep_ms),
    })
}

/// Write the command's lines into `state`
pub fn apply(command: &Command, state: &mut DisplayState) {
    let [line1, line2, line3] = &command.lines;
    state.set_body(
        [line1.as_str(), line2.as_str(), line3.as_str()],
        Align::centered(command.center),
    );
}

fn truncated(text: Option<&str>) -> Line {
    let mut line = Line::new();
    // 16 characters always fit LINE_CAPACITY bytes
    let _ = line.push_str(layout::truncate(text.unwrap_or("")));
    line
}
