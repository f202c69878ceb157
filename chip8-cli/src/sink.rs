//! Terminal frame output.
use std::io::Write;

use chip8::{DisplayBuffer, FrameSink};

/// Prints each frame as rows of `#` and `.` characters.
pub struct TextSink<W: Write> {
    out: W,
    frames: usize,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, frames: 0 }
    }

    /// Number of frames presented so far.
    pub fn frames(&self) -> usize {
        self.frames
    }

    fn write_frame(&mut self, display: &DisplayBuffer) -> std::io::Result<()> {
        let text = display
            .dump()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        writeln!(self.out, "frame {}", self.frames)?;
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }
}

impl<W: Write> FrameSink for TextSink<W> {
    fn draw(&mut self, display: &DisplayBuffer) {
        self.frames += 1;
        if let Err(err) = self.write_frame(display) {
            log::warn!("failed to present frame: {err}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chip8::DrawMode;

    #[test]
    fn test_text_frame() {
        let mut display = DisplayBuffer::new(4, 2);
        display.blit(1, 0, &[0b1000_0000], DrawMode::Linear);

        let mut sink = TextSink::new(Vec::new());
        sink.draw(&display);

        assert_eq!(sink.frames(), 1);
        assert_eq!(String::from_utf8(sink.out).unwrap(), "frame 1\n.#..\n....\n");
    }
}
