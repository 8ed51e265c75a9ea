//! Attract screen shown between participants
//!
//! Columns of random printable characters fall down the booth window until
//! someone presses a key.

use crate::display::{DisplaySurface, Key, Style};
use crate::error::DisplayError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Frame interval of the animation
pub const FRAME: Duration = Duration::from_millis(50);

/// Falling-character state, one head position per column
pub struct CodeRain {
    heads: Vec<i32>,
    rows: u16,
}

impl CodeRain {
    pub fn new(rows: u16, cols: u16, rng: &mut impl Rng) -> Self {
        Self {
            heads: (0..cols).map(|_| rng.gen_range(-20..=0)).collect(),
            rows,
        }
    }

    /// Advance every column one row.
    ///
    /// Returns the cells to draw as (row, col, char), and whether every
    /// column reached the bottom (the caller clears the window).
    pub fn tick(&mut self, rng: &mut impl Rng) -> (Vec<(u16, u16, char)>, bool) {
        let bottom = self.rows as i32 - 1;
        let mut cells = Vec::new();

        for (x, head) in self.heads.iter_mut().enumerate() {
            if *head < bottom {
                if *head >= 0 {
                    let c = char::from(rng.gen_range(33u8..=126));
                    cells.push((*head as u16, x as u16, c));
                }
                *head += 1;
            } else {
                *head = rng.gen_range(-20..=0);
            }
        }

        let wrapped = self.heads.iter().all(|&head| head >= bottom);
        if wrapped {
            for head in self.heads.iter_mut() {
                *head = rng.gen_range(-20..=0);
            }
        }
        (cells, wrapped)
    }
}

/// Run the animation until a key is pressed and return that key
pub async fn run(surface: &mut dyn DisplaySurface) -> Result<Key, DisplayError> {
    let mut rng = StdRng::from_entropy();
    let (rows, cols) = surface.size();
    let mut rain = CodeRain::new(rows, cols, &mut rng);

    surface.clear()?;
    loop {
        let (cells, wrapped) = rain.tick(&mut rng);
        if wrapped {
            surface.clear()?;
        }
        for (row, col, c) in cells {
            surface.put_text(row, col, c.encode_utf8(&mut [0; 4]), Style::Rain)?;
        }
        surface.flush()?;

        if let Some(key) = surface.poll_key(FRAME).await? {
            tracing::debug!("Attract screen dismissed");
            return Ok(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ScriptedSurface;

    #[test]
    fn test_cells_stay_inside_window() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut rain = CodeRain::new(14, 55, &mut rng);

        for _ in 0..200 {
            let (cells, _) = rain.tick(&mut rng);
            for (row, col, c) in cells {
                assert!(row < 13);
                assert!(col < 55);
                assert!(c.is_ascii_graphic());
            }
        }
    }

    #[test]
    fn test_columns_eventually_fall() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut rain = CodeRain::new(14, 3, &mut rng);
        let drawn: usize = (0..40).map(|_| rain.tick(&mut rng).0.len()).sum();
        assert!(drawn > 0);
    }

    #[tokio::test]
    async fn test_any_key_dismisses() {
        let mut surface = ScriptedSurface::new([Key::Char('q')]);
        let key = run(&mut surface).await.unwrap();
        assert_eq!(key, Key::Char('q'));
    }

    #[tokio::test]
    async fn test_closed_console_ends_animation() {
        let mut surface = ScriptedSurface::new(Vec::new());
        assert!(matches!(
            run(&mut surface).await,
            Err(DisplayError::InputClosed)
        ));
    }
}
