//! # `progress_pool`
//!
//! Concurrent multi-bar progress reporting with a single background render loop.
//!
//! A [`Pool`] owns one render thread. Any number of producer threads update
//! [`Bar`] handles; every tick the render thread snapshots all bars, draws
//! them as one frame in creation order and writes that frame over the
//! previous one. It is designed to be:
//!
//! * **Non-blocking for producers**: [`Bar::inc`], [`Bar::set_total`] and
//!   [`Bar::complete`] are atomics only and never wait on the render cadence.
//! * **Tear-free**: a frame is written in one call, and each bar's line comes
//!   from one consistent snapshot.
//! * **Orderly to shut down**: [`Pool::wait`] returns only after a frame with
//!   every bar's final state is on screen, and a [`ShutdownNotifier`] fires
//!   after that flush, never before.
//!
//! ```no_run
//! use std::{thread, time::Duration};
//!
//! use progress_pool::Pool;
//!
//! let pool = Pool::builder()
//!     .with_refresh_rate(Duration::from_millis(50))
//!     .build();
//!
//! thread::scope(|s| {
//!     for n in 0..3 {
//!         let bar = pool.new_bar(format!("download #{n}"), 100);
//!         s.spawn(move || {
//!             for _ in 0..100 {
//!                 bar.inc(1);
//!                 thread::sleep(Duration::from_millis(5));
//!             }
//!         });
//!     }
//! });
//! pool.wait();
//! ```
//!
//! ## Modules
//!
//! * [`bar`]: The [`Bar`] handle and its snapshots.
//! * [`registry`]: The ordered set of live bars.
//! * [`builder`]: Fluent [`PoolBuilder`] and [`BarBuilder`].
//! * [`config`]: Validated settings and their defaults.
//! * [`format`]: Five-glyph bar templates and line rendering.
//! * [`frame`]: One rendering of every bar.
//! * [`writer`]: Cursor-aware frame output.
//! * [`signal`]: Cancellation, shutdown notification and join primitives.
//! * [`io`]: Read/Write wrappers that advance a bar.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bar;
pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod io;
pub mod pool;
pub mod registry;
mod render;
pub mod signal;
pub mod writer;

pub use bar::{Bar, BarSnapshot};
pub use builder::{BarBuilder, PoolBuilder};
pub use config::PoolConfig;
pub use error::{Error, Result};
pub use format::Format;
pub use pool::Pool;
pub use registry::BarRegistry;
pub use render::Interceptor;
pub use signal::{
    CancelToken, Join, JoinGroup, JoinGuard, ShutdownListener, ShutdownNotifier, shutdown_channel,
};
