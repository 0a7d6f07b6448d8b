//! Readiness multiplexer binding.
//!
//! This module wraps the OS facility that blocks until registered
//! descriptors become ready. The context uses it to:
//! - register a descriptor for inbound or outbound readiness,
//! - remove a descriptor,
//! - wait, without timeout, for the next batch of ready descriptors.
//!
//! Timers are timerfd descriptors, so the Linux `epoll` backend is the only
//! one provided.

#[cfg(target_os = "linux")]
mod epoll;

#[cfg(target_os = "linux")]
pub(crate) type Poller = epoll::EpollPoller;

#[cfg(unix)]
pub(crate) mod unix;

#[cfg(unix)]
pub(crate) use unix as platform;
