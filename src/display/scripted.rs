//! In-memory display surface driven by a fixed key script
//!
//! Used for headless rehearsals and tests: keys are replayed in order and
//! every piece of drawn text is appended to a transcript. When the script
//! runs out, reads and polls fail with `DisplayError::InputClosed`.

use super::{DisplaySurface, Key, Style, WINDOW_COLS, WINDOW_ROWS};
use crate::error::DisplayError;
use std::collections::VecDeque;
use std::time::Duration;

pub struct ScriptedSurface {
    keys: VecDeque<Key>,
    rows: u16,
    cols: u16,
    transcript: Vec<String>,
    clears: usize,
}

impl ScriptedSurface {
    /// Surface with the booth's window size
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self::with_size(keys, WINDOW_ROWS, WINDOW_COLS)
    }

    pub fn with_size(keys: impl IntoIterator<Item = Key>, rows: u16, cols: u16) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            rows,
            cols,
            transcript: Vec::new(),
            clears: 0,
        }
    }

    /// Queue more keys after the current script
    pub fn push_keys(&mut self, keys: impl IntoIterator<Item = Key>) {
        self.keys.extend(keys);
    }

    /// Keys not consumed yet
    pub fn remaining_keys(&self) -> usize {
        self.keys.len()
    }

    /// Every text fragment drawn so far, in order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Whether any drawn fragment contains `needle`
    pub fn shows(&self, needle: &str) -> bool {
        self.transcript.iter().any(|t| t.contains(needle))
    }

    /// Number of drawn fragments containing `needle`
    pub fn count(&self, needle: &str) -> usize {
        self.transcript.iter().filter(|t| t.contains(needle)).count()
    }

    /// Number of times the window was cleared
    pub fn clears(&self) -> usize {
        self.clears
    }
}

#[async_trait::async_trait]
impl DisplaySurface for ScriptedSurface {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.clears += 1;
        Ok(())
    }

    fn draw_border(&mut self, _style: Style) -> Result<(), DisplayError> {
        Ok(())
    }

    fn put_text(
        &mut self,
        _row: u16,
        _col: u16,
        text: &str,
        _style: Style,
    ) -> Result<(), DisplayError> {
        if !text.trim().is_empty() {
            self.transcript.push(text.to_string());
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    async fn read_key(&mut self) -> Result<Key, DisplayError> {
        self.keys.pop_front().ok_or(DisplayError::InputClosed)
    }

    async fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>, DisplayError> {
        self.keys
            .pop_front()
            .map(Some)
            .ok_or(DisplayError::InputClosed)
    }
}
