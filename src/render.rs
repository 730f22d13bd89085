//! The render loop: one thread that owns the output and redraws on a ticker.
//!
//! The loop waits on three sources at once: its ticker, a control channel
//! from the [`Pool`](crate::Pool), and the cancellation token. It never
//! checks anything mid-write; cancellation and completion are both decided
//! between ticks.

use std::{
    convert::Infallible,
    io::Write,
    sync::Arc,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, select};
use parking_lot::Mutex;

use crate::{
    bar::BarSnapshot,
    config::{PoolConfig, validate_refresh_rate},
    error::Error,
    frame::Frame,
    registry::BarRegistry,
    signal::{Latch, ShutdownNotifier},
    writer::ScreenWriter,
};

/// A callback granted the output stream on every tick, after the bars.
///
/// Whatever it writes is drawn below the bars as part of the frame and is
/// repainted by the next one.
pub type Interceptor = Box<dyn FnMut(&mut dyn Write) + Send>;

pub(crate) enum Command {
    SetRefreshRate(Duration),
    /// The pool is waiting; stop once every bar is complete.
    Join,
    /// The pool was dropped without waiting.
    Stop,
}

pub(crate) struct RenderLoop {
    pub(crate) registry: BarRegistry,
    pub(crate) config: PoolConfig,
    pub(crate) writer: ScreenWriter,
    pub(crate) debug: Box<dyn Write + Send>,
    pub(crate) interceptors: Vec<Interceptor>,
    pub(crate) pending: Arc<Mutex<Vec<String>>>,
    pub(crate) control: Receiver<Command>,
    pub(crate) cancel: Receiver<Infallible>,
    pub(crate) shutdown: Option<ShutdownNotifier>,
    pub(crate) done: Arc<Latch>,
    /// Keep running after all bars complete until the pool asks to join.
    pub(crate) awaits_join: bool,
}

/// Fires the pool's done latch however the thread exits, panics included.
struct DoneGuard(Arc<Latch>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.fire();
    }
}

impl RenderLoop {
    pub(crate) fn run(mut self) {
        let _done = DoneGuard(self.done.clone());
        let mut ticker = crossbeam_channel::tick(self.config.refresh_rate());
        let mut join_requested = false;

        let (refresh_rate, width) = (self.config.refresh_rate(), self.config.width());
        tracing::debug!(target: "progress_pool", ?refresh_rate, width, "render loop started");
        self.diagnostic(format_args!(
            "render loop started: refresh rate {refresh_rate:?}, width {width}"
        ));

        loop {
            let ticks = ticker.clone();
            let control = self.control.clone();
            let cancel = self.cancel.clone();

            select! {
                recv(ticks) -> _ => {
                    if self.tick(join_requested) {
                        self.diagnostic(format_args!("all bars complete"));
                        break;
                    }
                }
                recv(control) -> command => match command {
                    Ok(Command::SetRefreshRate(rate)) => {
                        if let Some(rate) = self.accept_refresh_rate(rate) {
                            // Stop the old ticker before starting its replacement.
                            drop(std::mem::replace(&mut ticker, crossbeam_channel::never()));
                            ticker = crossbeam_channel::tick(rate);
                        }
                    }
                    Ok(Command::Join) => join_requested = true,
                    Ok(Command::Stop) | Err(_) => {
                        self.diagnostic(format_args!("pool dropped, abandoning bars"));
                        self.tick(true);
                        break;
                    }
                },
                recv(cancel) -> _ => {
                    self.diagnostic(format_args!("cancelled, abandoning bars"));
                    self.tick(true);
                    break;
                }
            }
        }

        drop(ticker);
        // The final frame is flushed; only now may anyone observe shutdown.
        if let Some(notifier) = self.shutdown.take() {
            notifier.notify();
        }
        tracing::debug!(target: "progress_pool", "render loop stopped");
    }

    /// Renders and writes one frame. Returns `true` when the loop should stop.
    fn tick(&mut self, join_requested: bool) -> bool {
        let started = Instant::now();
        let registered = self.registry.registered();
        let snapshots = self.registry.snapshot_all();

        let mut frame = Frame::render(&snapshots, self.config.format(), self.config.width());
        let mut below = Vec::new();
        {
            let sink: &mut dyn Write = &mut below;
            for interceptor in &mut self.interceptors {
                interceptor(&mut *sink);
            }
        }
        frame.push_below(&String::from_utf8_lossy(&below));

        let mut above = Vec::new();
        for line in self.pending.lock().drain(..) {
            above.extend_from_slice(line.as_bytes());
            above.push(b'\n');
        }

        if let Err(err) = self.writer.flush_frame(&above, &frame) {
            self.report(&err);
        }

        for snap in &snapshots {
            if snap.complete() && snap.remove_on_complete() {
                self.registry.remove(snap.id());
            }
        }

        tracing::trace!(
            target: "progress_pool",
            bars = snapshots.len(),
            elapsed = ?started.elapsed(),
            "tick"
        );

        let all_complete = snapshots.iter().all(BarSnapshot::complete);
        // A bar registered after the snapshot was taken hasn't been drawn yet.
        let unchanged = self.registry.registered() == registered;
        let may_stop = join_requested || (registered > 0 && !self.awaits_join);
        all_complete && unchanged && may_stop
    }

    fn accept_refresh_rate(&mut self, rate: Duration) -> Option<Duration> {
        match validate_refresh_rate(rate) {
            Ok(rate) => {
                self.config.set_refresh_rate(rate);
                tracing::debug!(target: "progress_pool", ?rate, "refresh rate changed");
                Some(rate)
            }
            Err(err) => {
                tracing::debug!(target: "progress_pool", %err, "ignoring refresh rate");
                None
            }
        }
    }

    fn report(&mut self, err: &Error) {
        tracing::warn!(target: "progress_pool", %err, "failed to write frame");
        self.diagnostic(format_args!("{err}"));
    }

    fn diagnostic(&mut self, message: std::fmt::Arguments<'_>) {
        // Diagnostics are best-effort; a broken debug sink is not worth reporting.
        let _ = writeln!(self.debug, "progress-pool: {message}");
    }
}
