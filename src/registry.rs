//! The live, ordered set of bars a pool renders.
//!
//! [`BarRegistry`] is the single place the render loop consults each tick.
//!
//! # Synchronization Strategy
//!
//! A coarse-grained [`RwLock`](parking_lot::RwLock) protects the *list* of
//! handles. Updating a bar does **not** touch this lock.
//!
//! * **Producers:** take the write lock only to add or remove a bar (rare).
//! * **Render loop:** takes the read lock once per tick to clone the handles,
//!   then snapshots each bar with the lock released.
//!
//! Ids come from the registry's own counter, and `add` inserts by id, so the
//! list is always in creation order even when adds from different threads land
//! out of order.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::bar::{Bar, BarSnapshot};

/// A thread-safe, shared-clonable registry of [`Bar`] handles.
#[derive(Clone, Default)]
pub struct BarRegistry {
    inner: Arc<RwLock<Vec<Bar>>>,
    next_id: Arc<AtomicU64>,
}

impl fmt::Debug for BarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only metadata, to avoid snapshotting every bar while formatting.
        f.debug_struct("BarRegistry")
            .field("count", &self.len())
            .field("registered", &self.registered())
            .finish()
    }
}

impl BarRegistry {
    /// Creates an empty registry.
    ///
    /// # Examples
    ///
    /// ```
    /// use progress_pool::BarRegistry;
    ///
    /// let registry = BarRegistry::new();
    /// assert!(registry.is_empty());
    /// assert_eq!(registry.registered(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next creation-order id.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// How many bars were ever handed an id, including removed ones.
    #[must_use]
    pub fn registered(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    /// Registers a bar at its creation-order position.
    ///
    /// # Parameters
    ///
    /// * `bar`: The handle to track. Its id decides where it is drawn.
    pub fn add(&self, bar: Bar) {
        let mut bars = self.inner.write();
        let at = bars.partition_point(|b| b.id < bar.id);
        bars.insert(at, bar);
    }

    /// Deregisters the bar with `id`. Returns whether it was present.
    ///
    /// The relative order of the remaining bars is unchanged.
    ///
    /// # Parameters
    ///
    /// * `id`: The [`Bar::id`] of the bar to drop.
    pub fn remove(&self, id: u64) -> bool {
        let mut bars = self.inner.write();
        match bars.binary_search_by_key(&id, |b| b.id) {
            Ok(at) => {
                bars.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    /// Snapshots every registered bar, in creation order, for one frame.
    ///
    /// The registry lock is held just long enough to clone the handles; the
    /// per-bar reads happen after it is released.
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<BarSnapshot> {
        let bars: Vec<Bar> = self.inner.read().clone();
        bars.iter().map(Bar::snapshot).collect()
    }

    /// Handles to all registered bars.
    #[must_use]
    pub fn items(&self) -> Vec<Bar> {
        self.inner.read().clone()
    }

    /// `true` if every registered bar is complete (vacuously for an empty registry).
    #[must_use]
    pub fn is_all_complete(&self) -> bool {
        self.inner.read().iter().all(Bar::is_complete)
    }

    /// Number of bars currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// `true` if no bars are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
