//! Fixed-width text layout for a 16 x 8 character panel.
//!
//! Rows are 8 pixels tall. The header occupies the top two rows, the
//! connectivity footer the bottom row, and up to three body lines float in
//! between depending on how many of them carry text.

use core::fmt::Write;

use heapless::String;

/// Characters per row
pub const COLUMNS: usize = 16;

/// Byte capacity of one fitted row (16 characters of up to 4 UTF-8 bytes)
pub const LINE_CAPACITY: usize = COLUMNS * 4;

/// Pixel height of one text row
pub const ROW_HEIGHT: i32 = 8;

/// Header title row
pub const TITLE_Y: i32 = 0;

/// Header subtitle row
pub const SUBTITLE_Y: i32 = TITLE_Y + ROW_HEIGHT;

/// Body position when only line 1 carries text
pub const BODY_BASE_Y: i32 = 32;

/// Connectivity footer row
pub const FOOTER_Y: i32 = 56;

/// One fitted row
pub type Line = String<LINE_CAPACITY>;

/// Horizontal alignment within a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Align {
    #[default]
    Left,
    /// Odd padding puts the extra space on the right
    Center,
}

impl Align {
    pub fn centered(center: bool) -> Self {
        if center {
            Align::Center
        } else {
            Align::Left
        }
    }
}

/// Cut `text` to at most [`COLUMNS`] characters
pub fn truncate(text: &str) -> &str {
    match text.char_indices().nth(COLUMNS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Truncate and pad `text` to exactly [`COLUMNS`] characters
pub fn fit(text: &str, align: Align) -> Line {
    let text = truncate(text);
    let mut line = Line::new();

    // At most 16 characters of at most 4 bytes each, so this cannot overflow
    let _ = match align {
        Align::Left => write!(line, "{:<width$}", text, width = COLUMNS),
        Align::Center => write!(line, "{:^width$}", text, width = COLUMNS),
    };
    line
}

/// Top row of the body block
///
/// The block moves up half a row when line 2 is used and a full row when
/// lines 2 and 3 are both used, keeping it visually centered.
pub fn body_offset(line2: &str, line3: &str) -> i32 {
    match (line2.is_empty(), line3.is_empty()) {
        (false, false) => BODY_BASE_Y - ROW_HEIGHT,
        (false, true) => BODY_BASE_Y - ROW_HEIGHT / 2,
        _ => BODY_BASE_Y,
    }
}
