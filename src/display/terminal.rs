//! crossterm-backed display surface
//!
//! Puts the terminal in raw mode on the alternate screen and draws a fixed
//! window centred on the screen. The terminal is restored when the surface
//! is dropped, and by a panic hook installed on open.

use super::{DisplaySurface, Key, Style};
use crate::error::DisplayError;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, execute, queue};
use futures::StreamExt;
use std::io::{self, IsTerminal, Stdout, Write};
use std::panic;
use std::time::Duration;

pub struct TerminalSurface {
    out: Stdout,
    events: EventStream,
    rows: u16,
    cols: u16,
    /// Screen position of the window's top-left corner (row, col)
    origin: (u16, u16),
}

impl TerminalSurface {
    /// Take over the terminal and centre a `rows` x `cols` window on it
    pub fn open(rows: u16, cols: u16) -> Result<Self, DisplayError> {
        if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
            return Err(DisplayError::NotATerminal);
        }

        // Restore the terminal before the panic message is printed
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(move |panic_info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
            original_hook(panic_info);
        }));

        enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All))?;

        let (screen_cols, screen_rows) = terminal::size()?;
        let origin = window_origin(screen_rows, screen_cols, rows, cols);
        tracing::debug!(
            "Terminal {}x{}, booth window at {:?}",
            screen_cols,
            screen_rows,
            origin
        );

        Ok(Self {
            out,
            events: EventStream::new(),
            rows,
            cols,
            origin,
        })
    }

    fn restore(&mut self) {
        let _ = execute!(self.out, ResetColor, LeaveAlternateScreen, cursor::Show);
        let _ = disable_raw_mode();
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Top-left corner that centres the window; pinned to 0 on small screens
fn window_origin(screen_rows: u16, screen_cols: u16, rows: u16, cols: u16) -> (u16, u16) {
    (
        (screen_rows / 2).saturating_sub(rows / 2),
        (screen_cols / 2).saturating_sub(cols / 2),
    )
}

fn colors(style: Style) -> (Color, Color, Option<Attribute>) {
    match style {
        Style::Title => (Color::Cyan, Color::Black, None),
        Style::Prompt => (Color::Green, Color::Black, None),
        Style::Highlight => (Color::White, Color::Blue, None),
        Style::Frame => (Color::Magenta, Color::Black, None),
        Style::Notice => (Color::White, Color::Black, Some(Attribute::SlowBlink)),
        Style::Rain => (Color::DarkGreen, Color::Black, None),
    }
}

/// Map a crossterm key event to a booth key.
///
/// Ctrl+C does not raise SIGINT in raw mode, so it is surfaced as an
/// interrupt here.
fn map_key(event: KeyEvent) -> Result<Key, DisplayError> {
    if event.modifiers.contains(KeyModifiers::CONTROL) && event.code == KeyCode::Char('c') {
        return Err(DisplayError::Interrupted);
    }

    Ok(match event.code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char('\n') | KeyCode::Char('\r') => Key::Enter,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    })
}

#[async_trait::async_trait]
impl DisplaySurface for TerminalSurface {
    fn size(&self) -> (u16, u16) {
        (self.rows, self.cols)
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        queue!(self.out, ResetColor, Clear(ClearType::All))?;
        Ok(())
    }

    fn draw_border(&mut self, style: Style) -> Result<(), DisplayError> {
        let inner = "─".repeat(self.cols.saturating_sub(2) as usize);
        let last = self.rows.saturating_sub(1);
        self.put_text(0, 0, &format!("┌{}┐", inner), style)?;
        for row in 1..last {
            self.put_text(row, 0, "│", style)?;
            self.put_text(row, self.cols.saturating_sub(1), "│", style)?;
        }
        self.put_text(last, 0, &format!("└{}┘", inner), style)
    }

    fn put_text(
        &mut self,
        row: u16,
        col: u16,
        text: &str,
        style: Style,
    ) -> Result<(), DisplayError> {
        if row >= self.rows || col >= self.cols {
            return Ok(());
        }
        let visible: String = text.chars().take((self.cols - col) as usize).collect();
        let (fg, bg, attr) = colors(style);

        queue!(
            self.out,
            cursor::MoveTo(self.origin.1 + col, self.origin.0 + row),
            SetForegroundColor(fg),
            SetBackgroundColor(bg)
        )?;
        if let Some(attr) = attr {
            queue!(self.out, SetAttribute(attr))?;
        }
        queue!(
            self.out,
            Print(visible),
            SetAttribute(Attribute::Reset),
            ResetColor
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.out.flush()?;
        Ok(())
    }

    async fn read_key(&mut self) -> Result<Key, DisplayError> {
        loop {
            match self.events.next().await {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    return map_key(key);
                }
                Some(Ok(Event::Resize(screen_cols, screen_rows))) => {
                    self.origin = window_origin(screen_rows, screen_cols, self.rows, self.cols);
                    tracing::debug!("Terminal resized, window now at {:?}", self.origin);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(DisplayError::Terminal(e.to_string())),
                None => return Err(DisplayError::InputClosed),
            }
        }
    }

    async fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>, DisplayError> {
        match tokio::time::timeout(timeout, self.read_key()).await {
            Ok(key) => key.map(Some),
            Err(_) => Ok(None),
        }
    }
}
