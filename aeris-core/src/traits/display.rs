//! Character display trait

/// Errors that can occur while drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Bus transaction failed
    Bus,
    /// Display not initialized
    NotReady,
}

/// Frame-buffered text display
///
/// `clear` and `draw_text` touch only the frame buffer; nothing is visible
/// until `present` pushes the buffer to the panel.
pub trait TextDisplay {
    /// Blank the frame buffer
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw `text` with its top-left corner at pixel (`x`, `y`)
    ///
    /// `row_id` is the logical row the text belongs to; drivers with a
    /// single colour treat any non-zero value as "on".
    fn draw_text(&mut self, text: &str, x: i32, y: i32, row_id: u8) -> Result<(), DisplayError>;

    /// Push the frame buffer to the panel
    fn present(&mut self) -> impl core::future::Future<Output = Result<(), DisplayError>>;
}
