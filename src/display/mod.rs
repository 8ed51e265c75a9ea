//! Display surface for the booth console
//!
//! The interview only needs a small fixed-size text window: clear it, draw a
//! border, put styled text at a (row, col), and read keys. `TerminalSurface`
//! implements this on a real terminal with crossterm; `ScriptedSurface`
//! replays a fixed key script in memory.

pub mod scripted;
pub mod terminal;

pub use scripted::ScriptedSurface;
pub use terminal::TerminalSurface;

use crate::error::DisplayError;
use std::time::Duration;

/// Window height used by the booth (rows, including border)
pub const WINDOW_ROWS: u16 = 14;

/// Window width used by the booth (columns, including border)
pub const WINDOW_COLS: u16 = 55;

/// Keys the booth reacts to. Everything else arrives as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Up,
    Down,
    Left,
    Right,
    Backspace,
    Escape,
    Char(char),
    Other,
}

impl Key {
    /// Keys produced by typing `text` (no trailing Enter)
    pub fn typed(text: &str) -> Vec<Key> {
        text.chars().map(Key::Char).collect()
    }

    /// Keys produced by a card reader: the track data followed by Enter
    pub fn swipe(track: &str) -> Vec<Key> {
        let mut keys = Key::typed(track);
        keys.push(Key::Enter);
        keys
    }
}

/// Colour roles used on the console
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Cyan headline text (countdown digits, selection echo)
    Title,
    /// Green body text
    Prompt,
    /// White on blue, used for the highlighted option
    Highlight,
    /// Magenta window border
    Frame,
    /// Blinking call to action
    Notice,
    /// Falling characters on the attract screen
    Rain,
}

/// Fixed-size text console the interview renders onto
#[async_trait::async_trait]
pub trait DisplaySurface: Send {
    /// Window size as (rows, cols), border included
    fn size(&self) -> (u16, u16);

    /// Blank the whole window
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw the window border
    fn draw_border(&mut self, style: Style) -> Result<(), DisplayError>;

    /// Draw text at a window-relative position, clipped to the window
    fn put_text(&mut self, row: u16, col: u16, text: &str, style: Style)
        -> Result<(), DisplayError>;

    /// Blank one row inside the border
    fn clear_row(&mut self, row: u16) -> Result<(), DisplayError> {
        let (_, cols) = self.size();
        let blank = " ".repeat(cols.saturating_sub(2) as usize);
        self.put_text(row, 1, &blank, Style::Prompt)
    }

    /// Push pending drawing to the screen
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Block until a key is pressed
    async fn read_key(&mut self) -> Result<Key, DisplayError>;

    /// Wait up to `timeout` for a key
    async fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>, DisplayError>;

    /// Read a line of text with echo, up to `max_len` characters.
    /// Backspace edits, Enter finishes; other keys are ignored.
    async fn read_line(
        &mut self,
        row: u16,
        col: u16,
        max_len: usize,
    ) -> Result<String, DisplayError> {
        let mut line = String::new();
        loop {
            match self.read_key().await? {
                Key::Enter => return Ok(line),
                Key::Backspace => {
                    if line.pop().is_some() {
                        let pos = col + line.chars().count() as u16;
                        self.put_text(row, pos, " ", Style::Prompt)?;
                        self.flush()?;
                    }
                }
                Key::Char(c) if !c.is_control() && line.chars().count() < max_len => {
                    let pos = col + line.chars().count() as u16;
                    line.push(c);
                    self.put_text(row, pos, &c.to_string(), Style::Prompt)?;
                    self.flush()?;
                }
                _ => {}
            }
        }
    }
}

/// Column that centres `text` in a window `cols` wide, never left of column 2
pub fn centered_col(cols: u16, text: &str) -> u16 {
    let len = text.chars().count() as u16;
    (cols / 2).saturating_sub(len / 2).max(2)
}
