//! Bar templates and single-line rendering.
//!
//! A [`Format`] is five glyphs: left cap, fill, tip, empty, right cap. The
//! default `[=>-]` renders a half-done bar as `[====>-----]`.

use std::{fmt, fmt::Write as _, str::FromStr};

use crate::{
    bar::BarSnapshot,
    error::{Error, Result},
};

/// Number of glyphs a bar format must contain.
pub const FORMAT_LEN: usize = 5;

/// The format used when none is configured.
pub const DEFAULT_FORMAT: &str = "[=>-]";

/// A validated five-glyph bar template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct Format {
    glyphs: [char; FORMAT_LEN],
}

impl Default for Format {
    fn default() -> Self {
        Self {
            glyphs: ['[', '=', '>', '-', ']'],
        }
    }
}

impl Format {
    /// Parses a template, rejecting anything that isn't exactly [`FORMAT_LEN`] glyphs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] with the glyph count found.
    pub fn parse(template: &str) -> Result<Self> {
        let glyphs: Vec<char> = template.chars().collect();
        let glyphs: [char; FORMAT_LEN] = glyphs
            .try_into()
            .map_err(|rejected: Vec<char>| Error::InvalidFormat {
                glyphs: rejected.len(),
            })?;
        Ok(Self { glyphs })
    }

    /// Left cap glyph.
    #[must_use]
    pub const fn left(&self) -> char {
        self.glyphs[0]
    }

    /// Glyph for completed cells.
    #[must_use]
    pub const fn fill(&self) -> char {
        self.glyphs[1]
    }

    /// Glyph at the leading edge of progress.
    #[must_use]
    pub const fn tip(&self) -> char {
        self.glyphs[2]
    }

    /// Glyph for remaining cells.
    #[must_use]
    pub const fn empty(&self) -> char {
        self.glyphs[3]
    }

    /// Right cap glyph.
    #[must_use]
    pub const fn right(&self) -> char {
        self.glyphs[4]
    }

    /// Renders one bar line bounded to `width` characters.
    ///
    /// Layout is `name [fill] suffix`, where the suffix is a percentage for bars
    /// with a known total and the raw count otherwise. The fill region takes
    /// whatever width is left; when there isn't room for it, it is omitted and
    /// the line truncated.
    #[must_use]
    pub fn render_line(&self, snap: &BarSnapshot, width: usize) -> String {
        let suffix = match snap.percent() {
            Some(pct) => format!(" {pct:>3}%"),
            None => format!(" {}", snap.current()),
        };

        // A control character in the name must not break the line in two.
        let name: String = snap
            .name()
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let name_len = name.chars().count();
        let prefix_len = if name.is_empty() { 0 } else { name_len + 1 };

        let mut line = String::with_capacity(width);
        if !name.is_empty() {
            line.push_str(&name);
            line.push(' ');
        }

        let used = prefix_len + suffix.chars().count() + 2;
        if let Some(inner) = width.checked_sub(used).filter(|w| *w > 0) {
            line.push(self.left());
            self.push_cells(&mut line, snap, inner);
            line.push(self.right());
        } else if line.ends_with(' ') {
            line.pop();
        }
        line.push_str(&suffix);

        truncate(line, width)
    }

    fn push_cells(&self, line: &mut String, snap: &BarSnapshot, inner: usize) {
        let total = snap.total();
        if total == 0 {
            line.extend(std::iter::repeat_n(self.empty(), inner));
            return;
        }
        if snap.current() >= total {
            line.extend(std::iter::repeat_n(self.fill(), inner));
            return;
        }

        // u128 keeps `inner * current` from overflowing for huge totals.
        let filled = (inner as u128 * u128::from(snap.current()) / u128::from(total)) as usize;
        if filled == 0 {
            line.extend(std::iter::repeat_n(self.empty(), inner));
        } else {
            line.extend(std::iter::repeat_n(self.fill(), filled - 1));
            line.push(self.tip());
            line.extend(std::iter::repeat_n(self.empty(), inner - filled));
        }
    }
}

fn truncate(line: String, width: usize) -> String {
    match line.char_indices().nth(width) {
        Some((idx, _)) => line[..idx].to_owned(),
        None => line,
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Format {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Format> for String {
    fn from(format: Format) -> Self {
        format.to_string()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for glyph in self.glyphs {
            f.write_char(glyph)?;
        }
        Ok(())
    }
}
