//! Writes frames over the previous frame on an output stream.
//!
//! [`ScreenWriter`] remembers how many frame lines it drew last time. Before the
//! next frame it moves the cursor up over them and clears to the end of the
//! screen, then writes out-of-band text followed by the new frame. All of
//! that goes out in a single `write_all` so nothing else writing to the same
//! stream can land in the middle of a frame.

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveToColumn, MoveUp},
    queue,
    terminal::{Clear, ClearType},
};

use crate::{error::Result, frame::Frame};

/// Cursor-aware frame writer over any [`Write`] sink.
pub struct ScreenWriter {
    out: Box<dyn Write + Send>,
    /// Frame lines on screen from the last successful flush.
    lines: usize,
}

impl std::fmt::Debug for ScreenWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenWriter")
            .field("lines", &self.lines)
            .finish_non_exhaustive()
    }
}

impl Default for ScreenWriter {
    fn default() -> Self {
        Self::new(io::stdout())
    }
}

impl ScreenWriter {
    /// Wraps `out`.
    pub fn new<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Box::new(out),
            lines: 0,
        }
    }

    /// A writer that drops everything.
    #[must_use]
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    /// Number of frame lines the last flush left on screen.
    #[must_use]
    pub const fn lines(&self) -> usize {
        self.lines
    }

    /// Replaces the previous frame with `above` followed by `frame`.
    ///
    /// `above` is out-of-band text that scrolls up and stays; only the frame's
    /// own lines, including anything pushed below the bars, are overwritten
    /// next time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the sink rejects the write or
    /// the flush. The line count is left untouched in that case.
    pub fn flush_frame(&mut self, above: &[u8], frame: &Frame) -> Result<()> {
        let mut buf = Vec::with_capacity(16 + above.len() + frame.as_str().len());
        if self.lines > 0 {
            let up = u16::try_from(self.lines).unwrap_or(u16::MAX);
            queue!(
                buf,
                MoveToColumn(0),
                MoveUp(up),
                Clear(ClearType::FromCursorDown)
            )?;
        }
        buf.extend_from_slice(above);
        if !above.is_empty() && !above.ends_with(b"\n") {
            buf.push(b'\n');
        }
        buf.extend_from_slice(frame.as_str().as_bytes());

        self.out.write_all(&buf)?;
        self.out.flush()?;
        self.lines = frame.lines();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{self, Write},
        sync::Arc,
    };

    use parking_lot::Mutex;

    use super::ScreenWriter;
    use crate::{bar::Bar, format::Format, frame::Frame};

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<Vec<u8>>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn frame_of(n: usize) -> Frame {
        let bars: Vec<_> = (0..n)
            .map(|i| Bar::new(i as u64, "x", 1).snapshot())
            .collect();
        Frame::render(&bars, &Format::default(), 10)
    }

    /// The first frame is written as-is; later ones move up over the previous bars.
    #[test]
    fn test_overwrites_previous_frame() {
        let capture = Capture::default();
        let mut writer = ScreenWriter::new(capture.clone());

        writer.flush_frame(b"", &frame_of(2)).unwrap();
        writer.flush_frame(b"log line", &frame_of(3)).unwrap();

        let writes = capture.0.lock();
        assert_eq!(writes.len(), 2, "one write per frame");
        assert!(!writes[0].starts_with(b"\x1b["));

        let second = String::from_utf8(writes[1].clone()).unwrap();
        assert!(second.starts_with("\x1b[1G\x1b[2A\x1b[J"), "{second:?}");
        assert!(second.contains("log line\n"));
        assert_eq!(writer.lines(), 3);
    }

    #[test]
    fn test_failed_write_keeps_line_count() {
        let mut writer = ScreenWriter::new(Broken);
        assert!(writer.flush_frame(b"", &frame_of(2)).is_err());
        assert_eq!(writer.lines(), 0);
    }
}
