//! One-shot and level-triggered signals shared between producers, the pool and
//! the render thread.
//!
//! All signals are built on [`Latch`]: a flag paired with a channel whose only
//! sender is dropped when the latch fires. A disconnected
//! [`crossbeam_channel::Receiver`] stays ready forever, which makes every
//! signal level-triggered and lets the render loop wait on it inside
//! `select!` next to its ticker.

use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

/// Fires at most once; observers see it fired forever after.
pub(crate) struct Latch {
    fired: AtomicBool,
    tx: Mutex<Option<Sender<Infallible>>>,
    rx: Receiver<Infallible>,
}

impl Latch {
    pub(crate) fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        Self {
            fired: AtomicBool::new(false),
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Fires the latch. Returns `true` only for the call that caused the transition.
    pub(crate) fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        // Dropping the only sender disconnects every receiver clone.
        self.tx.lock().take();
        true
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    pub(crate) fn wait(&self) {
        if self.is_fired() {
            return;
        }
        match self.rx.recv() {
            Ok(never) => match never {},
            Err(_) => {}
        }
    }

    /// Returns `true` if the latch fired before `timeout` elapsed.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_fired() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(never) => match never {},
            Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => self.is_fired(),
        }
    }

    pub(crate) fn receiver(&self) -> Receiver<Infallible> {
        self.rx.clone()
    }
}

/// A level-triggered cancellation source.
///
/// Clones share state. Once [`cancel`](Self::cancel) is called the token stays
/// cancelled; a pool holding it stops rendering within one tick.
#[derive(Clone)]
pub struct CancelToken {
    latch: Arc<Latch>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    /// Creates a token that is not yet cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            latch: Arc::new(Latch::new()),
        }
    }

    /// Cancels the token. Calling it again has no effect.
    pub fn cancel(&self) {
        if self.latch.fire() {
            tracing::debug!(target: "progress_pool", "cancellation requested");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.latch.is_fired()
    }

    pub(crate) fn receiver(&self) -> Receiver<Infallible> {
        self.latch.receiver()
    }
}

/// Creates a connected shutdown notifier/listener pair.
///
/// Hand the notifier to [`PoolBuilder::with_shutdown_notifier`](crate::PoolBuilder::with_shutdown_notifier)
/// and keep the listener.
#[must_use]
pub fn shutdown_channel() -> (ShutdownNotifier, ShutdownListener) {
    let latch = Arc::new(Latch::new());
    (
        ShutdownNotifier {
            latch: latch.clone(),
        },
        ShutdownListener { latch },
    )
}

/// The sending half of a one-shot shutdown notification.
///
/// The notification fires when this value is consumed by [`notify`](Self::notify)
/// or dropped, so it can never fire twice.
pub struct ShutdownNotifier {
    latch: Arc<Latch>,
}

impl ShutdownNotifier {
    /// Fires the notification.
    pub fn notify(self) {
        drop(self);
    }
}

impl Drop for ShutdownNotifier {
    fn drop(&mut self) {
        self.latch.fire();
    }
}

impl std::fmt::Debug for ShutdownNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownNotifier").finish_non_exhaustive()
    }
}

/// The observing half of a one-shot shutdown notification.
#[derive(Clone)]
pub struct ShutdownListener {
    latch: Arc<Latch>,
}

impl ShutdownListener {
    /// Blocks until the notification fires.
    pub fn wait(&self) {
        self.latch.wait();
    }

    /// Blocks for at most `timeout`. Returns `true` if the notification fired.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.latch.wait_timeout(timeout)
    }

    /// Whether the notification has fired.
    #[must_use]
    pub fn is_notified(&self) -> bool {
        self.latch.is_fired()
    }

    /// A receiver that disconnects once the notification fires, for use in
    /// [`crossbeam_channel::select!`].
    #[must_use]
    pub fn receiver(&self) -> Receiver<Infallible> {
        self.latch.receiver()
    }
}

impl std::fmt::Debug for ShutdownListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownListener")
            .field("notified", &self.is_notified())
            .finish()
    }
}

/// An external synchronization point a [`Pool`](crate::Pool) can wait on
/// before it stops rendering.
///
/// The pool only ever calls [`join`](Self::join); it never adds to or releases
/// the handle, so callers may join it themselves as well.
pub trait Join: Send + Sync {
    /// Blocks until the external work tracked by this handle has finished.
    fn join(&self);
}

impl<J: Join + ?Sized> Join for Arc<J> {
    fn join(&self) {
        (**self).join();
    }
}

/// A counting join primitive for producer threads.
///
/// Each producer registers with [`add`](Self::add) (or holds a [`JoinGuard`])
/// and calls [`done`](Self::done) when finished; [`wait`](Self::wait) blocks
/// until the count returns to zero.
#[derive(Clone, Default)]
pub struct JoinGroup {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl std::fmt::Debug for JoinGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinGroup")
            .field("pending", &self.pending())
            .finish()
    }
}

impl JoinGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `n` more pending units of work.
    pub fn add(&self, n: usize) {
        *self.inner.0.lock() += n;
    }

    /// Marks one unit of work finished. Extra calls saturate at zero.
    pub fn done(&self) {
        let (count, cvar) = &*self.inner;
        let mut count = count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            cvar.notify_all();
        }
    }

    /// Registers one unit of work and returns a guard that finishes it on drop.
    #[must_use]
    pub fn guard(&self) -> JoinGuard {
        self.add(1);
        JoinGuard {
            group: self.clone(),
        }
    }

    /// Number of units still pending.
    #[must_use]
    pub fn pending(&self) -> usize {
        *self.inner.0.lock()
    }

    /// Blocks until no work is pending.
    pub fn wait(&self) {
        let (count, cvar) = &*self.inner;
        let mut count = count.lock();
        while *count > 0 {
            cvar.wait(&mut count);
        }
    }
}

impl Join for JoinGroup {
    fn join(&self) {
        self.wait();
    }
}

/// Finishes one unit of a [`JoinGroup`] when dropped.
#[derive(Debug)]
pub struct JoinGuard {
    group: JoinGroup,
}

impl Drop for JoinGuard {
    fn drop(&mut self) {
        self.group.done();
    }
}
