//! Monochrome display buffer and sprite compositor.
use std::fmt::{self, Write};

use crate::constants::*;

/// How sprite pixels that fall past the edges of the display are placed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DrawMode {
    /// Pixels are addressed by their linear offset `y * width + x`,
    /// without wrapping or clipping coordinates.
    ///
    /// A sprite running past the right edge continues on the next row,
    /// and pixels beyond the end of the buffer are discarded.
    #[default]
    Linear,
    /// Each pixel coordinate wraps around to the opposite edge of the display.
    Wrap,
}

/// Grid of 1-bit pixels, stored row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayBuffer {
    width: usize,
    height: usize,
    pixels: Box<[bool]>,
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new(DISPLAY_WIDTH, DISPLAY_HEIGHT)
    }
}

impl DisplayBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width * height].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel state at the given coordinate. Out of bounds reads are unlit.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x < self.width && y < self.height {
            self.pixels[x + y * self.width]
        } else {
            false
        }
    }

    /// All pixels, row major.
    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.pixels
    }

    /// Iterate the rows of the display, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.pixels.chunks(self.width.max(1))
    }

    /// Pixels as a grid of `0` and `1` values, for frame sinks.
    pub fn to_grid(&self) -> Vec<Vec<u8>> {
        self.rows()
            .map(|row| row.iter().map(|px| *px as u8).collect())
            .collect()
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// XOR a sprite into the buffer, with its top left corner at `(x, y)`.
    ///
    /// Each byte of `rows` is one row of 8 pixels, most significant bit on the left.
    /// Returns `true` if any lit pixel was erased, which is how programs detect collisions.
    pub fn blit(&mut self, x: usize, y: usize, rows: &[u8], mode: DrawMode) -> bool {
        let mut is_erased = false;

        for (r, row) in rows.iter().enumerate() {
            for c in 0..SPRITE_WIDTH {
                let new_px = (row >> (7 - c)) & 1 != 0;
                if !new_px {
                    // XOR with zero leaves the pixel as is.
                    continue;
                }

                let Some(d) = self.index(x + c, y + r, mode) else {
                    continue;
                };

                let old_px = self.pixels[d];

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px;

                self.pixels[d] = !old_px;
            }
        }

        is_erased
    }

    /// Buffer offset of a pixel coordinate, if it lands in the buffer.
    #[inline]
    fn index(&self, x: usize, y: usize, mode: DrawMode) -> Option<usize> {
        match mode {
            DrawMode::Linear => {
                let d = y * self.width + x;
                (d < self.pixels.len()).then_some(d)
            }
            DrawMode::Wrap => {
                if self.width == 0 || self.height == 0 {
                    None
                } else {
                    Some((x % self.width) + (y % self.height) * self.width)
                }
            }
        }
    }

    /// Render the buffer as text, `#` for lit and `.` for unlit pixels.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::with_capacity((self.width + 1) * self.height);

        for row in self.rows() {
            for px in row {
                if *px {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_blit_xor() {
        let mut display = DisplayBuffer::default();

        assert!(!display.blit(0, 0, &[0b1111_0000], DrawMode::Linear));
        assert!(display.get(0, 0));
        assert!(display.get(3, 0));
        assert!(!display.get(4, 0));

        // Zero bits of the second sprite don't erase the first.
        assert!(!display.blit(4, 0, &[0b1111_0000], DrawMode::Linear));
        assert!(display.get(0, 0));
        assert!(display.get(7, 0));

        // Overlap erases and flags a collision.
        assert!(display.blit(2, 0, &[0b1000_0000], DrawMode::Linear));
        assert!(!display.get(2, 0));
    }

    #[test]
    fn test_blit_linear_overflows_into_next_row() {
        let mut display = DisplayBuffer::new(8, 2);

        display.blit(6, 0, &[0b1111_0000], DrawMode::Linear);
        assert!(display.get(6, 0));
        assert!(display.get(7, 0));
        assert!(display.get(0, 1));
        assert!(display.get(1, 1));
        assert!(!display.get(2, 1));
    }

    #[test]
    fn test_blit_linear_discards_past_end() {
        let mut display = DisplayBuffer::new(8, 2);

        let erased = display.blit(0, 1, &[0xFF, 0xFF, 0xFF], DrawMode::Linear);
        assert!(!erased);
        assert_eq!(display.as_slice().iter().filter(|px| **px).count(), 8);
        assert!(display.rows().nth(1).unwrap().iter().all(|px| *px));
    }

    #[test]
    fn test_blit_wrap() {
        let mut display = DisplayBuffer::new(8, 2);

        display.blit(6, 1, &[0b1110_0000, 0b1000_0000], DrawMode::Wrap);
        assert!(display.get(6, 1));
        assert!(display.get(7, 1));
        assert!(display.get(0, 1));
        // second row wrapped to the top
        assert!(display.get(6, 0));
        assert!(!display.get(0, 0));
    }

    #[test]
    fn test_dump() {
        let mut display = DisplayBuffer::new(4, 2);
        display.blit(0, 0, &[0b1010_0000, 0b0101_0000], DrawMode::Linear);
        assert_eq!(display.dump().unwrap(), "#.#.\n.#.#\n");
        assert_eq!(display.to_grid(), vec![vec![1, 0, 1, 0], vec![0, 1, 0, 1]]);
    }
}
