//! Core primitives for tracking the state of one progress line.
//!
//! This module defines the [`Bar`] handle producers update. It follows a
//! "Hot/Cold" split so updates never contend with the render thread:
//!
//! * **Hot Data:** Current, total and the completion latch are atomics. `inc`
//!   is a lock-free compare-and-swap loop that clamps at a known total.
//! * **Cold Data:** The display name sits behind an [`RwLock`](parking_lot::RwLock)
//!   and is only touched on renames and once per render tick.
//!
//! # Snapshots
//!
//! The render loop never reads the atomics piecemeal. It asks for a
//! [`BarSnapshot`], which re-reads `total` around `current` until the pair is
//! stable, so one bar's fields never tear within a frame.

use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use compact_str::CompactString;
use crossbeam_channel::Receiver;
use parking_lot::RwLock;

use crate::{format::Format, signal::Latch};

/// A thread-safe, cloneable handle to one progress line.
///
/// Cloning is cheap (Arc bumps) and every clone points at the same state, so a
/// bar can be handed to as many producer threads as needed. A total of `0`
/// means the size of the work is not known yet; [`set_total`](Self::set_total)
/// may supply it later.
#[derive(Clone)]
pub struct Bar {
    /// Creation order; doubles as display order.
    pub(crate) id: u64,

    /// Template override. `None` renders with the pool's format.
    pub(crate) format: Option<Format>,

    /// Drop the bar from the registry after its completed line was drawn.
    pub(crate) remove_on_complete: bool,

    pub(crate) cold: Arc<RwLock<Cold>>,

    // Atomic fields for wait-free updates on the hot path.
    pub(crate) current: Arc<AtomicU64>,
    pub(crate) total: Arc<AtomicU64>,
    pub(crate) done: Arc<Latch>,
}

/// "Cold" storage for metadata that changes infrequently.
pub(crate) struct Cold {
    pub(crate) name: CompactString,
}

impl std::fmt::Debug for Bar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bar")
            .field("id", &self.id)
            .field("current", &self.get_current())
            .field("total", &self.get_total())
            .field("complete", &self.is_complete())
            .finish_non_exhaustive()
    }
}

impl Bar {
    pub(crate) fn new(id: u64, name: impl Into<CompactString>, total: u64) -> Self {
        Self {
            id,
            format: None,
            remove_on_complete: false,
            cold: Arc::new(RwLock::new(Cold { name: name.into() })),
            current: Arc::new(AtomicU64::new(0)),
            total: Arc::new(AtomicU64::new(total)),
            done: Arc::new(Latch::new()),
        }
    }

    /// The bar's creation-order identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    // ========================================================================
    // Metadata Accessors
    // ========================================================================

    /// Gets the bar's label.
    #[must_use]
    pub fn name(&self) -> CompactString {
        self.cold.read().name.clone()
    }

    /// Updates the bar's label.
    pub fn set_name(&self, name: impl Into<CompactString>) {
        self.cold.write().name = name.into();
    }

    // ========================================================================
    // State (Hot Path)
    // ========================================================================

    /// Adds `amount` to the current value.
    ///
    /// Saturates at the total when it is known, and completes the bar when the
    /// total is reached. Never blocks.
    pub fn inc(&self, amount: u64) {
        if amount == 0 {
            return;
        }

        let mut current = self.current.load(Ordering::Acquire);
        loop {
            let total = self.total.load(Ordering::Acquire);
            let next = clamp(current.saturating_add(amount), total);
            if next == current {
                // Already pinned at the total.
                self.complete_if_reached(next, total);
                return;
            }

            match self.current.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.complete_if_reached(next, total);
                    self.reconcile(total);
                    return;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Sets the absolute current value, clamped to a known total.
    pub fn set_current(&self, value: u64) {
        let total = self.total.load(Ordering::Acquire);
        let value = clamp(value, total);
        self.current.store(value, Ordering::Release);
        self.complete_if_reached(value, total);
        self.reconcile(total);
    }

    /// Gets the current value, never above a known total.
    #[must_use]
    pub fn get_current(&self) -> u64 {
        self.load_hot().0
    }

    /// Gets the total. `0` means unknown.
    #[must_use]
    pub fn get_total(&self) -> u64 {
        self.total.load(Ordering::Acquire)
    }

    /// Sets or updates the total, at any point in the bar's life.
    ///
    /// `0` turns the bar indeterminate. A known total below the current value
    /// pulls the current value down to it, and a total equal to the current
    /// value completes the bar.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Release);
        if total == 0 {
            return;
        }
        let previous = self.current.fetch_min(total, Ordering::AcqRel);
        self.complete_if_reached(previous.min(total), total);
    }

    /// Completion percentage (0 to 100), or `None` while the total is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        let (current, total, _) = self.load_hot();
        percent(current, total)
    }

    // ========================================================================
    // Lifecycle Management
    // ========================================================================

    /// Marks the bar finished and fires its done signal.
    ///
    /// Only the first call has an effect; it is the only one returning `true`.
    pub fn complete(&self) -> bool {
        let fired = self.done.fire();
        if fired {
            tracing::trace!(target: "progress_pool", id = self.id, "bar complete");
        }
        fired
    }

    /// Whether the bar has completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.done.is_fired()
    }

    /// Blocks until the bar completes.
    pub fn wait(&self) {
        self.done.wait();
    }

    /// Blocks for at most `timeout`. Returns `true` if the bar completed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.done.wait_timeout(timeout)
    }

    /// A receiver that disconnects once the bar completes, for use in
    /// [`crossbeam_channel::select!`].
    #[must_use]
    pub fn done(&self) -> Receiver<Infallible> {
        self.done.receiver()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn complete_if_reached(&self, current: u64, total: u64) {
        if total != 0 && current >= total {
            self.complete();
        }
    }

    /// Re-clamps after a write that was computed against `seen_total`.
    ///
    /// A `set_total` landing between that load and the write has already run
    /// its own clamp, so the write may sit above the new total. Clamp it again
    /// and complete against the fresh pair.
    fn reconcile(&self, seen_total: u64) {
        let total = self.total.load(Ordering::Acquire);
        if total == seen_total || total == 0 {
            return;
        }
        let previous = self.current.fetch_min(total, Ordering::AcqRel);
        self.complete_if_reached(previous.min(total), total);
    }

    /// Reads `(current, total, complete)` as one consistent triple.
    fn load_hot(&self) -> (u64, u64, bool) {
        loop {
            // Completion first: once it is seen, every update that preceded it is visible below.
            let complete = self.done.is_fired();
            let total = self.total.load(Ordering::Acquire);
            let current = self.current.load(Ordering::Acquire);
            if self.total.load(Ordering::Acquire) == total {
                return (clamp(current, total), total, complete);
            }
        }
    }

    /// Creates a consistent snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> BarSnapshot {
        self.into()
    }
}

const fn clamp(value: u64, total: u64) -> u64 {
    if total == 0 || value < total {
        value
    } else {
        total
    }
}

fn percent(current: u64, total: u64) -> Option<u64> {
    if total == 0 {
        return None;
    }
    Some((u128::from(current) * 100 / u128::from(total)) as u64)
}

/// A plain-data snapshot of a [`Bar`] at a specific point in time.
///
/// Holds owned data and needs no locking to read, which is what a frame is
/// assembled from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BarSnapshot {
    id: u64,
    name: CompactString,
    current: u64,
    total: u64,
    complete: bool,
    format: Option<Format>,
    remove_on_complete: bool,
}

impl From<&Bar> for BarSnapshot {
    fn from(bar: &Bar) -> Self {
        let name = bar.cold.read().name.clone();
        let (current, total, complete) = bar.load_hot();

        Self {
            id: bar.id,
            name,
            current,
            total,
            complete,
            format: bar.format,
            remove_on_complete: bar.remove_on_complete,
        }
    }
}

impl BarSnapshot {
    /// The bar's creation-order identifier.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The bar's label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    /// Total value, `0` if unknown.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Whether the bar had completed.
    #[must_use]
    pub const fn complete(&self) -> bool {
        self.complete
    }

    /// Completion percentage, `None` while the total is unknown.
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        percent(self.current, self.total)
    }

    /// Template override, if the bar has one.
    #[must_use]
    pub const fn format(&self) -> Option<Format> {
        self.format
    }

    pub(crate) const fn remove_on_complete(&self) -> bool {
        self.remove_on_complete
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Barrier, atomic::Ordering},
        thread,
        time::Duration,
    };

    use super::Bar;

    /// Basic Lifecycle
    /// New -> Inc -> reaching the total completes the bar.
    #[test]
    fn test_basic_lifecycle() {
        let bar = Bar::new(0, "job", 100);

        assert_eq!(bar.get_current(), 0);
        assert!(!bar.is_complete());
        assert_eq!(bar.percent(), Some(0));

        bar.inc(50);
        assert_eq!(bar.get_current(), 50);
        assert_eq!(bar.percent(), Some(50));

        bar.inc(50);
        assert!(bar.is_complete());
        assert_eq!(bar.snapshot().percent(), Some(100));
    }

    /// Concurrent increments are lossless and clamp at the total.
    #[test]
    fn test_concurrent_increments_clamp() {
        let unbounded = Bar::new(0, "sum", 0);
        let bounded = Bar::new(1, "clamped", 750);
        let mut handles = vec![];

        for _ in 0..10 {
            let unbounded = unbounded.clone();
            let bounded = bounded.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    unbounded.inc(1);
                    bounded.inc(1);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(unbounded.get_current(), 1000);
        assert!(!unbounded.is_complete(), "unknown totals never auto-complete");
        assert_eq!(bounded.get_current(), 750);
        assert!(bounded.is_complete());
    }

    /// Completing any number of times signals exactly once.
    #[test]
    fn test_complete_is_idempotent() {
        let bar = Bar::new(0, "once", 10);
        let done = bar.done();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bar = bar.clone();
                thread::spawn(move || bar.complete())
            })
            .collect();
        let fired = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|fired| *fired)
            .count();

        assert_eq!(fired, 1);
        assert!(done.recv().is_err(), "done channel disconnects on completion");
        for _ in 0..3 {
            assert!(bar.snapshot().complete());
        }
    }

    /// A bar of unknown size can learn its total late.
    #[test]
    fn test_set_total_after_increments() {
        let bar = Bar::new(0, "late", 0);
        bar.inc(30);
        assert_eq!(bar.percent(), None);

        bar.set_total(60);
        assert_eq!(bar.percent(), Some(50));
        assert!(!bar.is_complete());

        // Shrinking below the current value pulls current down and completes.
        bar.set_total(20);
        assert_eq!(bar.get_current(), 20);
        assert!(bar.is_complete());
    }

    /// An increment computed against an unknown total, whose write lands after
    /// `set_total` already clamped, is clamped again and completes the bar.
    #[test]
    fn test_inc_racing_set_total_completes() {
        let bar = Bar::new(0, "race", 0);
        bar.inc(10);

        // `inc(30)` has loaded total 0 and computed 40 when `set_total(20)` runs.
        bar.set_total(20);
        assert!(!bar.is_complete());

        // Then its compare-and-swap lands.
        bar.current
            .compare_exchange(10, 40, Ordering::AcqRel, Ordering::Acquire)
            .unwrap();
        bar.complete_if_reached(40, 0);
        bar.reconcile(0);

        assert_eq!(bar.current.load(Ordering::Acquire), 20);
        assert!(bar.is_complete());
        assert_eq!(bar.snapshot().percent(), Some(100));
    }

    /// The same reconciliation covers an absolute store.
    #[test]
    fn test_set_current_racing_set_total_completes() {
        let bar = Bar::new(0, "race", 0);
        bar.set_total(20);
        // `set_current(50)` loaded total 0 before `set_total` and stores 50 afterwards.
        bar.current.store(50, Ordering::Release);
        bar.reconcile(0);

        assert_eq!(bar.current.load(Ordering::Acquire), 20);
        assert!(bar.is_complete());
    }

    /// Racing `inc` against `set_total` never leaves a full bar incomplete.
    #[test]
    fn test_inc_and_set_total_race_stress() {
        for _ in 0..500 {
            let bar = Bar::new(0, "stress", 0);
            bar.inc(10);
            let barrier = Arc::new(Barrier::new(2));

            let incrementer = {
                let (bar, barrier) = (bar.clone(), barrier.clone());
                thread::spawn(move || {
                    barrier.wait();
                    bar.inc(30);
                })
            };
            barrier.wait();
            bar.set_total(20);
            incrementer.join().unwrap();

            assert!(bar.current.load(Ordering::Acquire) <= 20);
            assert!(bar.is_complete());
        }
    }

    #[test]
    fn test_set_current_clamps() {
        let bar = Bar::new(0, "abs", 10);
        bar.set_current(4);
        assert_eq!(bar.get_current(), 4);
        bar.set_current(400);
        assert_eq!(bar.get_current(), 10);
        assert!(bar.is_complete());
    }

    /// Waiters on other threads are released by completion.
    #[test]
    fn test_wait_released_by_completion() {
        let bar = Bar::new(0, "waited", 3);
        assert!(!bar.wait_timeout(Duration::from_millis(5)));

        let waiter = {
            let bar = bar.clone();
            thread::spawn(move || bar.wait())
        };
        for _ in 0..3 {
            bar.inc(1);
        }
        waiter.join().unwrap();
        assert!(bar.is_complete());
    }

    /// Snapshots are owned copies and reflect renames.
    #[test]
    fn test_snapshot_isolation() {
        let bar = Bar::new(7, "before", 100);
        bar.inc(10);
        let first = bar.snapshot();

        bar.set_name("after");
        bar.inc(20);
        let second = bar.snapshot();

        assert_eq!(first.current(), 10);
        assert_eq!(first.name(), "before");
        assert_eq!(second.current(), 30);
        assert_eq!(second.name(), "after");
        assert_eq!(second.id(), 7);
    }
}
