//! # uev
//!
//! **uev** is a minimal single-threaded event loop for Linux. A process
//! registers interest in descriptor readiness and in timer expirations, and
//! one blocking wait dispatches a callback for every event.
//!
//! It is intentionally the simplest reactor that multiplexes I/O and timers
//! correctly:
//!
//! - **I/O watchers** on caller-owned descriptors, inbound or outbound,
//!   level-triggered
//! - **Timer watchers** backed by timerfd on the monotonic clock, one-shot or
//!   recurring
//! - **Re-entrant callbacks** that may register, rearm or delete watchers and
//!   stop the loop
//! - **Checked handles**: a deleted watcher's handle is rejected, never
//!   dangling
//!
//! There is no multi-threaded dispatch and no priority between watchers;
//! events are dispatched in the order epoll reports them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use uev::Context;
//!
//! fn main() -> uev::Result<()> {
//!     let mut ctx = Context::new()?;
//!     let mut ticks = 0;
//!
//!     ctx.timer_create(Duration::ZERO, Duration::from_millis(100), move |ctx, _| {
//!         ticks += 1;
//!         println!("tick {ticks}");
//!
//!         if ticks == 3 {
//!             ctx.exit();
//!         }
//!     })?;
//!
//!     ctx.run()
//! }
//! ```
//!
//! ## Logging
//!
//! Registration, deletion and loop failures are reported through the
//! [`log`] facade. No logger is installed by the crate.

#[cfg(not(target_os = "linux"))]
compile_error!("uev requires Linux: it is built on epoll and timerfd");

mod error;
mod reactor;
mod utils;

pub use error::{Error, Result};
pub use reactor::{Context, ContextBuilder, Direction, Watcher, WatcherKind};
