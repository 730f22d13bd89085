//! Fluent interfaces for constructing a [`Pool`] and its bars.
//!
//! # Key Features
//!
//! * **Validated options:** Each `with_*` call is checked on the spot. An
//!   out-of-range value is logged and dropped, leaving the previous or default
//!   value; building never fails.
//! * **Signals:** Cancellation, shutdown notification and an external join
//!   point are plugged in here and owned by the pool from then on.

use std::{
    fmt,
    io::{self, Write},
    time::Duration,
};

use compact_str::CompactString;

use crate::{
    bar::Bar,
    config::PoolConfig,
    format::Format,
    pool::Pool,
    render::Interceptor,
    signal::{CancelToken, Join, ShutdownNotifier},
    writer::ScreenWriter,
};

/// A builder for a [`Pool`]. Options are applied once, at [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use progress_pool::PoolBuilder;
///
/// let pool = PoolBuilder::new()
///     .with_output(None::<std::io::Sink>)
///     .with_width(60)
///     .with_format("|#>.|")
///     .with_refresh_rate(Duration::from_millis(50))
///     .build();
/// assert_eq!(pool.config().width(), 60);
/// assert_eq!(pool.config().format().to_string(), "|#>.|");
/// ```
pub struct PoolBuilder {
    pub(crate) config: PoolConfig,
    pub(crate) output: ScreenWriter,
    pub(crate) debug_output: Box<dyn Write + Send>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) shutdown: Option<ShutdownNotifier>,
    pub(crate) join: Option<Box<dyn Join>>,
    pub(crate) interceptors: Vec<Interceptor>,
}

impl Default for PoolBuilder {
    fn default() -> Self {
        Self {
            config: PoolConfig::default(),
            output: ScreenWriter::default(),
            debug_output: Box::new(io::sink()),
            cancel: None,
            shutdown: None,
            join: None,
            interceptors: Vec::new(),
        }
    }
}

impl fmt::Debug for PoolBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuilder")
            .field("config", &self.config)
            .field("cancel", &self.cancel)
            .field("shutdown", &self.shutdown.is_some())
            .field("join", &self.join.is_some())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

impl PoolBuilder {
    /// Starts from the defaults: stdout, 80 columns, `[=>-]`, 120ms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the validated settings wholesale.
    #[must_use]
    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Caps rendered lines at `width` characters. Negative values are ignored.
    #[must_use]
    pub fn with_width(mut self, width: i64) -> Self {
        self.config.set_width(width);
        self
    }

    /// Overrides the five-glyph bar template. Any other glyph count is ignored.
    #[must_use]
    pub fn with_format(mut self, template: &str) -> Self {
        self.config.set_format(template);
        self
    }

    /// Sets the render cadence. Values under 10ms are ignored.
    #[must_use]
    pub fn with_refresh_rate(mut self, rate: Duration) -> Self {
        self.config.set_refresh_rate(rate);
        self
    }

    /// Stops rendering early once `token` is cancelled.
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fires `notifier` after the render loop has written its final frame.
    #[must_use]
    pub fn with_shutdown_notifier(mut self, notifier: ShutdownNotifier) -> Self {
        self.shutdown = Some(notifier);
        self
    }

    /// Makes [`Pool::wait`] first wait on `join`, e.g. a [`JoinGroup`](crate::JoinGroup)
    /// the producers hold.
    ///
    /// The pool never adds to or releases the handle.
    #[must_use]
    pub fn with_join(mut self, join: impl Join + 'static) -> Self {
        self.join = Some(Box::new(join));
        self
    }

    /// Writes frames to `output`. `None` discards them.
    #[must_use]
    pub fn with_output<W: Write + Send + 'static>(mut self, output: Option<W>) -> Self {
        self.output = output.map_or_else(ScreenWriter::discard, ScreenWriter::new);
        self
    }

    /// Writes diagnostics to `output`. `None` discards them (the default).
    #[must_use]
    pub fn with_debug_output<W: Write + Send + 'static>(mut self, output: Option<W>) -> Self {
        self.debug_output = match output {
            Some(w) => Box::new(w),
            None => Box::new(io::sink()),
        };
        self
    }

    /// Replaces the interceptor list.
    #[must_use]
    pub fn with_interceptors<I>(mut self, interceptors: I) -> Self
    where
        I: IntoIterator<Item = Interceptor>,
    {
        self.interceptors = interceptors.into_iter().collect();
        self
    }

    /// Appends one interceptor.
    #[must_use]
    pub fn with_interceptor<F>(mut self, interceptor: F) -> Self
    where
        F: FnMut(&mut dyn Write) + Send + 'static,
    {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Builds the pool and starts its render loop.
    #[must_use]
    pub fn build(self) -> Pool {
        Pool::start(self)
    }
}

/// A builder for a [`Bar`] registered with a [`Pool`].
///
/// Obtained from [`Pool::bar`].
#[must_use]
pub struct BarBuilder<'a> {
    pool: &'a Pool,
    name: CompactString,
    total: u64,
    format: Option<Format>,
    remove_on_complete: bool,
}

impl fmt::Debug for BarBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarBuilder")
            .field("name", &self.name)
            .field("total", &self.total)
            .field("format", &self.format)
            .field("remove_on_complete", &self.remove_on_complete)
            .finish_non_exhaustive()
    }
}

impl<'a> BarBuilder<'a> {
    pub(crate) fn new(pool: &'a Pool, name: impl Into<CompactString>) -> Self {
        Self {
            pool,
            name: name.into(),
            total: 0,
            format: None,
            remove_on_complete: false,
        }
    }

    /// Sets the total. `0` (the default) means unknown.
    pub const fn total(mut self, total: u64) -> Self {
        self.total = total;
        self
    }

    /// Overrides the pool's template for this bar. Invalid templates are ignored.
    pub fn format(mut self, template: &str) -> Self {
        match Format::parse(template) {
            Ok(format) => self.format = Some(format),
            Err(err) => tracing::debug!(target: "progress_pool", %err, "ignoring bar format"),
        }
        self
    }

    /// Drops the bar from the display once its completed line has been drawn.
    pub const fn remove_on_complete(mut self, remove: bool) -> Self {
        self.remove_on_complete = remove;
        self
    }

    /// Creates the bar, registers it and returns the producer handle.
    pub fn build(self) -> Bar {
        let registry = self.pool.registry();
        let mut bar = Bar::new(registry.next_id(), self.name, self.total);
        bar.format = self.format;
        bar.remove_on_complete = self.remove_on_complete;
        registry.add(bar.clone());
        bar
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::PoolBuilder;
    use crate::config::{DEFAULT_REFRESH_RATE, DEFAULT_WIDTH};

    /// Invalid options are dropped without affecting valid ones.
    #[test]
    fn test_invalid_options_ignored() {
        let builder = PoolBuilder::new()
            .with_width(-5)
            .with_format("[=]")
            .with_refresh_rate(Duration::from_millis(1));

        assert_eq!(builder.config.width(), DEFAULT_WIDTH);
        assert_eq!(builder.config.format().to_string(), "[=>-]");
        assert_eq!(builder.config.refresh_rate(), DEFAULT_REFRESH_RATE);

        let builder = builder
            .with_width(30)
            .with_width(-1)
            .with_format("|#>.|")
            .with_format("|#>.|||")
            .with_refresh_rate(Duration::from_millis(40))
            .with_refresh_rate(Duration::from_millis(5));

        assert_eq!(builder.config.width(), 30);
        assert_eq!(builder.config.format().to_string(), "|#>.|");
        assert_eq!(builder.config.refresh_rate(), Duration::from_millis(40));
    }

    #[test]
    fn test_interceptors_replace_then_append() {
        let builder = PoolBuilder::new()
            .with_interceptor(|_| {})
            .with_interceptors(Vec::new())
            .with_interceptor(|w| {
                let _ = w.write_all(b"x");
            });
        assert_eq!(builder.interceptors.len(), 1);
    }
}
