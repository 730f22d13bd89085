//! One rendering of every registered bar at one instant.

use crate::{bar::BarSnapshot, format::Format};

/// An immutable, newline-terminated block of bar lines in creation order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Frame {
    text: String,
    lines: usize,
}

impl Frame {
    /// Renders `snapshots` with `format` (unless a bar overrides it), each
    /// line bounded to `width` characters.
    #[must_use]
    pub fn render(snapshots: &[BarSnapshot], format: &Format, width: usize) -> Self {
        let mut text = String::with_capacity(snapshots.len() * (width + 1));
        for snap in snapshots {
            let format = snap.format().unwrap_or(*format);
            text.push_str(&format.render_line(snap, width));
            text.push('\n');
        }
        Self {
            text,
            lines: snapshots.len(),
        }
    }

    /// Appends free-form text below the bar lines.
    ///
    /// Each line of `text` becomes a frame line, so the next frame overwrites
    /// it along with the bars.
    pub fn push_below(&mut self, text: &str) {
        for line in text.lines() {
            self.text.push_str(line);
            self.text.push('\n');
            self.lines += 1;
        }
    }

    /// Number of lines in the frame.
    #[must_use]
    pub const fn lines(&self) -> usize {
        self.lines
    }

    /// The frame text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the frame has no lines.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.lines == 0
    }
}
