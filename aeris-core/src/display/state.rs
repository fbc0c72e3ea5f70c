//! Current display content

use core::fmt::Write;
use core::net::Ipv4Addr;

use heapless::String;

use super::layout::{
    body_offset, fit, Align, Line, FOOTER_Y, ROW_HEIGHT, SUBTITLE_Y, TITLE_Y,
};
use crate::traits::{DisplayError, TextDisplay};

/// Footer text while no address is assigned
pub const NOT_CONNECTED: &str = "Not connected";

/// Logical row ids handed to the display driver
mod row {
    pub const TITLE: u8 = 1;
    pub const SUBTITLE: u8 = 2;
    pub const FIRST: u8 = 3;
    pub const REST: u8 = 4;
}

/// Everything the panel shows, already fitted to 16 columns
///
/// Written by the node's sampling path and by remote commands; the node
/// owns the single instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    title: Line,
    subtitle: Line,
    lines: [Line; 3],
    align: Align,
    offset: i32,
    footer: Line,
}

impl DisplayState {
    /// Blank body, "Not connected" footer
    pub fn new(title: &str, subtitle: &str) -> Self {
        let blank = fit("", Align::Left);
        Self {
            title: fit(title, Align::Center),
            subtitle: fit(subtitle, Align::Center),
            lines: [blank.clone(), blank.clone(), blank],
            align: Align::Left,
            offset: body_offset("", ""),
            footer: fit(NOT_CONNECTED, Align::Center),
        }
    }

    /// Replace the three body lines
    ///
    /// Placement is decided from the raw text: an empty line 2 or 3 frees
    /// its row and the block shifts accordingly.
    pub fn set_body(&mut self, lines: [&str; 3], align: Align) {
        for (slot, text) in self.lines.iter_mut().zip(lines) {
            *slot = fit(text, align);
        }
        self.align = align;
        self.offset = body_offset(lines[1], lines[2]);
    }

    /// Refresh the footer from the link's current address
    pub fn set_connectivity(&mut self, address: Option<Ipv4Addr>) {
        self.footer = match address {
            Some(address) => {
                let mut text: String<16> = String::new();
                // "255.255.255.255" is 15 characters
                let _ = write!(text, "{}", address);
                fit(&text, Align::Center)
            }
            None => fit(NOT_CONNECTED, Align::Center),
        };
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    /// Fitted body line `index` (0-2)
    pub fn line(&self, index: usize) -> &str {
        self.lines.get(index).map(|line| line.as_str()).unwrap_or("")
    }

    pub fn align(&self) -> Align {
        self.align
    }

    /// Pixel row of body line 1
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn footer(&self) -> &str {
        &self.footer
    }

    /// Redraw the frame buffer from this state
    ///
    /// Does not present; the caller decides when the panel is updated.
    pub fn render<D: TextDisplay>(&self, display: &mut D) -> Result<(), DisplayError> {
        display.clear()?;
        display.draw_text(&self.title, 0, TITLE_Y, row::TITLE)?;
        display.draw_text(&self.subtitle, 0, SUBTITLE_Y, row::SUBTITLE)?;

        let mut y = self.offset;
        for (index, line) in self.lines.iter().enumerate() {
            let id = if index == 0 { row::FIRST } else { row::REST };
            display.draw_text(line, 0, y, id)?;
            y += ROW_HEIGHT;
        }

        display.draw_text(&self.footer, 0, FOOTER_Y, row::REST)
    }
}
