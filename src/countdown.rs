//! Countdown before the shutter fires

use crate::config::{CountdownConfig, CountdownStyle};
use crate::display::{centered_col, DisplaySurface, Style};
use crate::error::DisplayError;
use std::time::Duration;

/// Seven-row glyphs for the large countdown, index 0 is the digit 1
const BIG_DIGITS: [[&str; 7]; 5] = [
    [
        "   1   ", "  11   ", " 1 1   ", "   1   ", "   1   ", "   1   ", " 11111 ",
    ],
    [
        "222222 ", "2     2", "      2", "222222 ", "2      ", "2     2", "222222 ",
    ],
    [
        "333333 ", "      3", "      3", "333333 ", "      3", "      3", "333333 ",
    ],
    [
        "4     4", "4     4", "4     4", "4444444", "      4", "      4", "      4",
    ],
    [
        "5555555", "5      ", "5      ", "555555 ", "      5", "5     5", "555555 ",
    ],
];

/// Glyph rows for `digit` (1..=5)
pub fn big_digit(digit: u8) -> Option<&'static [&'static str; 7]> {
    match digit {
        1..=5 => BIG_DIGITS.get(digit as usize - 1),
        _ => None,
    }
}

/// Renders the countdown on the booth window
#[derive(Debug, Clone)]
pub struct Countdown {
    style: CountdownStyle,
    step: Duration,
    settle: Duration,
}

impl Countdown {
    pub fn new(config: &CountdownConfig) -> Self {
        Self {
            style: config.style,
            step: Duration::from_millis(config.step_ms),
            settle: Duration::from_millis(config.settle_ms),
        }
    }

    /// Numbers shown, highest first
    pub fn steps(&self) -> Vec<u8> {
        let top = match self.style {
            CountdownStyle::Digits => 3,
            CountdownStyle::BigDigits => 5,
        };
        (1..=top).rev().collect()
    }

    /// Full redraw per step, one `step` apart, then `settle`
    pub async fn run(&self, surface: &mut dyn DisplaySurface) -> Result<(), DisplayError> {
        for n in self.steps() {
            surface.clear()?;
            match self.style {
                CountdownStyle::Digits => draw_small(surface, n)?,
                CountdownStyle::BigDigits => draw_big(surface, n)?,
            }
            surface.draw_border(Style::Frame)?;
            surface.flush()?;
            tracing::trace!("Countdown {}", n);
            tokio::time::sleep(self.step).await;
        }
        tokio::time::sleep(self.settle).await;
        Ok(())
    }
}

fn draw_small(surface: &mut dyn DisplaySurface, n: u8) -> Result<(), DisplayError> {
    let (rows, cols) = surface.size();
    let text = n.to_string();
    surface.put_text(rows / 2, centered_col(cols, &text), &text, Style::Title)
}

fn draw_big(surface: &mut dyn DisplaySurface, n: u8) -> Result<(), DisplayError> {
    let Some(glyph) = big_digit(n) else {
        return draw_small(surface, n);
    };
    let (rows, cols) = surface.size();
    let top = (rows / 2).saturating_sub(glyph.len() as u16 / 2);
    let col = centered_col(cols, glyph[0]);
    for (i, line) in glyph.iter().enumerate() {
        surface.put_text(top + i as u16, col, line, Style::Title)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ScriptedSurface;

    fn countdown(style: CountdownStyle) -> Countdown {
        Countdown::new(&CountdownConfig {
            style,
            step_ms: 0,
            settle_ms: 0,
        })
    }

    #[test]
    fn test_steps() {
        assert_eq!(countdown(CountdownStyle::Digits).steps(), vec![3, 2, 1]);
        assert_eq!(
            countdown(CountdownStyle::BigDigits).steps(),
            vec![5, 4, 3, 2, 1]
        );
    }

    #[test]
    fn test_glyphs_are_uniform() {
        for digit in 1..=5 {
            let glyph = big_digit(digit).unwrap();
            assert!(glyph.iter().all(|row| row.chars().count() == 7));
            assert!(glyph
                .iter()
                .any(|row| row.contains(char::from(b'0' + digit))));
        }
        assert!(big_digit(0).is_none());
        assert!(big_digit(6).is_none());
    }

    #[tokio::test]
    async fn test_each_step_is_a_full_redraw() {
        let mut surface = ScriptedSurface::new(Vec::new());
        countdown(CountdownStyle::Digits)
            .run(&mut surface)
            .await
            .unwrap();

        assert_eq!(surface.clears(), 3);
        assert_eq!(surface.transcript(), &["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_big_digits_draw_seven_rows() {
        let mut surface = ScriptedSurface::new(Vec::new());
        countdown(CountdownStyle::BigDigits)
            .run(&mut surface)
            .await
            .unwrap();

        assert_eq!(surface.clears(), 5);
        assert_eq!(surface.transcript().len(), 35);
        assert!(surface.shows("4444444"));
    }
}
