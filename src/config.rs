//! Validated pool settings.
//!
//! Every setter checks its value against a fixed rule and keeps the previous
//! value when the check fails. Rejections are logged, never returned to the
//! caller as a failure.
//!
//! | Setting | Default | Rule |
//! |---|---|---|
//! | width | 80 | non-negative |
//! | format | `[=>-]` | exactly five glyphs |
//! | refresh rate | 120ms | at least 10ms |

use std::time::Duration;

use crate::{
    error::{Error, Result},
    format::Format,
};

/// Default line width.
pub const DEFAULT_WIDTH: usize = 80;

/// Default render cadence.
pub const DEFAULT_REFRESH_RATE: Duration = Duration::from_millis(120);

/// Cadences below this are rejected.
pub const MIN_REFRESH_RATE: Duration = Duration::from_millis(10);

/// The pool settings that carry a validation rule.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfig {
    width: usize,
    format: Format,
    refresh_rate: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            format: Format::default(),
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

impl PoolConfig {
    /// Line width in characters.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Bar template.
    #[must_use]
    pub const fn format(&self) -> &Format {
        &self.format
    }

    /// Render cadence.
    #[must_use]
    pub const fn refresh_rate(&self) -> Duration {
        self.refresh_rate
    }

    /// Sets the width unless it is negative. Returns whether it was applied.
    pub fn set_width(&mut self, width: i64) -> bool {
        apply(&mut self.width, validate_width(width), "width")
    }

    /// Sets the template unless it isn't five glyphs. Returns whether it was applied.
    pub fn set_format(&mut self, template: &str) -> bool {
        apply(&mut self.format, Format::parse(template), "format")
    }

    /// Sets the cadence unless it is under [`MIN_REFRESH_RATE`]. Returns whether it was applied.
    pub fn set_refresh_rate(&mut self, rate: Duration) -> bool {
        apply(
            &mut self.refresh_rate,
            validate_refresh_rate(rate),
            "refresh_rate",
        )
    }
}

/// Checks a width override.
///
/// # Errors
///
/// [`Error::InvalidWidth`] for negative values.
pub fn validate_width(width: i64) -> Result<usize> {
    usize::try_from(width).map_err(|_| Error::InvalidWidth(width))
}

/// Checks a cadence override.
///
/// # Errors
///
/// [`Error::RefreshRateTooShort`] below [`MIN_REFRESH_RATE`].
pub fn validate_refresh_rate(rate: Duration) -> Result<Duration> {
    if rate < MIN_REFRESH_RATE {
        return Err(Error::RefreshRateTooShort(rate));
    }
    Ok(rate)
}

fn apply<T>(slot: &mut T, value: Result<T>, option: &'static str) -> bool {
    match value {
        Ok(value) => {
            *slot = value;
            true
        }
        Err(err) => {
            tracing::debug!(target: "progress_pool", option, %err, "ignoring option");
            false
        }
    }
}
