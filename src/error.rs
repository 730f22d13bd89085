//! Error types.
//!
//! Nothing in the producer path returns these. They exist so the configuration
//! validators and the [`ScreenWriter`](crate::writer::ScreenWriter) can report
//! *why* something was rejected, which the pool then logs and swallows.

use std::time::Duration;

use thiserror::Error;

/// Reasons a configuration value was rejected or an output write failed.
#[derive(Debug, Error)]
pub enum Error {
    /// Bar width must be non-negative.
    #[error("invalid width {0}: must be non-negative")]
    InvalidWidth(i64),

    /// A bar format must consist of exactly [`FORMAT_LEN`](crate::format::FORMAT_LEN) glyphs.
    #[error("invalid bar format: expected 5 glyphs, got {glyphs}")]
    InvalidFormat {
        /// Number of glyphs in the rejected template.
        glyphs: usize,
    },

    /// Refresh cadence below the allowed floor.
    #[error("refresh rate {0:?} is below the 10ms floor")]
    RefreshRateTooShort(Duration),

    /// Writing a frame to the output failed.
    #[error("output write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, Error>;
