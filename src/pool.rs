//! The [`Pool`]: owner of the registry, the render thread and its signals.

use std::{
    fmt,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

use compact_str::CompactString;
use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::{
    bar::Bar,
    builder::{BarBuilder, PoolBuilder},
    config::{PoolConfig, validate_refresh_rate},
    registry::BarRegistry,
    render::{Command, RenderLoop},
    signal::{CancelToken, Join, Latch},
};

/// Coordinates a set of bars and the single thread that draws them.
///
/// A pool starts rendering as soon as it is built. Producers get [`Bar`]
/// handles from [`new_bar`](Self::new_bar) or [`bar`](Self::bar) and update
/// them from any thread; nothing they do waits on the render cadence.
/// [`wait`](Self::wait) returns once the final frame is on screen.
///
/// `Pool` is `Send + Sync`, so it can be shared by reference (scoped threads)
/// or behind an [`Arc`].
pub struct Pool {
    registry: BarRegistry,
    config: PoolConfig,
    control: Sender<Command>,
    pending: Arc<Mutex<Vec<String>>>,
    cancel: CancelToken,
    join: Option<Box<dyn Join>>,
    done: Arc<Latch>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// A pool with default settings, drawing to stdout.
    #[must_use]
    pub fn new() -> Self {
        PoolBuilder::new().build()
    }

    /// Starts configuring a pool.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub(crate) fn start(builder: PoolBuilder) -> Self {
        let PoolBuilder {
            config,
            output,
            debug_output,
            cancel,
            shutdown,
            join,
            interceptors,
        } = builder;

        let registry = BarRegistry::new();
        let (control, control_rx) = crossbeam_channel::unbounded();
        let pending = Arc::new(Mutex::new(Vec::new()));
        let cancel = cancel.unwrap_or_default();
        let done = Arc::new(Latch::new());

        let render = RenderLoop {
            registry: registry.clone(),
            config: config.clone(),
            writer: output,
            debug: debug_output,
            awaits_join: join.is_some() || !interceptors.is_empty(),
            interceptors,
            pending: pending.clone(),
            control: control_rx,
            cancel: cancel.receiver(),
            shutdown,
            done: done.clone(),
        };

        let handle = thread::Builder::new()
            .name("progress-pool-render".into())
            .spawn(move || render.run());
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(err) => {
                // Without a render thread nothing will ever draw; report done so waiters return.
                tracing::warn!(target: "progress_pool", %err, "failed to spawn render thread");
                done.fire();
                None
            }
        };

        Self {
            registry,
            config,
            control,
            pending,
            cancel,
            join,
            done,
            handle: Mutex::new(handle),
        }
    }

    /// Creates and registers a bar with a known total (`0` for unknown).
    ///
    /// This is a shorthand for [`bar`](Self::bar) with only a total set.
    ///
    /// # Parameters
    ///
    /// * `name`: The label drawn in front of the bar.
    /// * `total`: The value that completes the bar, or `0` if not yet known.
    ///
    /// # Examples
    ///
    /// ```
    /// use progress_pool::Pool;
    ///
    /// let pool = Pool::builder().with_output(None::<std::io::Sink>).build();
    /// let bar = pool.new_bar("download", 10);
    /// bar.inc(10);
    /// assert!(bar.is_complete());
    /// pool.wait();
    /// ```
    pub fn new_bar(&self, name: impl Into<CompactString>, total: u64) -> Bar {
        self.bar(name).total(total).build()
    }

    /// Starts building a bar with more options.
    ///
    /// # Parameters
    ///
    /// * `name`: The label drawn in front of the bar.
    pub fn bar(&self, name: impl Into<CompactString>) -> BarBuilder<'_> {
        BarBuilder::new(self, name)
    }

    /// Removes a bar from the display. Returns whether it was registered.
    pub fn remove_bar(&self, bar: &Bar) -> bool {
        self.registry.remove(bar.id())
    }

    /// The live registry this pool renders.
    #[must_use]
    pub const fn registry(&self) -> &BarRegistry {
        &self.registry
    }

    /// The settings the pool was built with.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Queues a line to print above the bars on the next tick.
    ///
    /// Once the render loop has stopped nothing prints queued lines, so the
    /// line is dropped.
    pub fn println(&self, line: impl Into<String>) {
        let line = line.into();
        if self.is_done() {
            tracing::debug!(target: "progress_pool", %line, "render loop stopped, dropping line");
            return;
        }
        self.pending.lock().push(line);
    }

    /// Changes the render cadence; the ticker is replaced immediately.
    ///
    /// Values under 10ms are ignored.
    pub fn set_refresh_rate(&self, rate: Duration) {
        match validate_refresh_rate(rate) {
            Ok(rate) => {
                let _ = self.control.send(Command::SetRefreshRate(rate));
            }
            Err(err) => tracing::debug!(target: "progress_pool", %err, "ignoring refresh rate"),
        }
    }

    /// Stops rendering after the current tick; unfinished bars are abandoned.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the render loop has stopped and flushed its final frame.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.is_fired()
    }

    /// Blocks until rendering has stopped and the final frame is flushed.
    ///
    /// With an external join handle, that handle is waited on first so every
    /// producer has created its bars before completion is judged. The render
    /// loop then stops at the first tick that finds every bar complete, so the
    /// last frame always shows final state. Calling `wait` again returns
    /// immediately.
    pub fn wait(&self) {
        if !self.is_done() {
            if let Some(join) = &self.join {
                join.join();
            }
            // Fails only if the loop already exited, which `done` covers.
            let _ = self.control.send(Command::Join);
            self.done.wait();
        }
        self.reap();
    }

    fn reap(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!(target: "progress_pool", "render thread panicked");
            }
        }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        if !self.is_done() {
            let _ = self.control.send(Command::Stop);
        }
        self.reap();
    }
}
