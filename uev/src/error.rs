use std::collections::TryReserveError;
use std::io;
use std::os::fd::RawFd;

use thiserror::Error;

/// Result type for event loop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a [`Context`](crate::Context).
///
/// Construction-time failures are fully unwound before they are returned:
/// no descriptor or registration is left behind. Failures raised while the
/// loop runs ([`Wait`](Error::Wait), [`TimerRead`](Error::TimerRead)) stop
/// the loop and are returned from [`Context::run`](crate::Context::run).
#[derive(Debug, Error)]
pub enum Error {
    /// A watcher handle is stale or refers to the wrong kind of watcher.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Room for a new watcher could not be allocated.
    #[error("out of memory")]
    OutOfMemory(#[from] TryReserveError),

    /// The epoll handle or the event buffer could not be acquired.
    #[error("failed to acquire event loop resources: {0}")]
    Resource(#[source] io::Error),

    /// The readiness multiplexer rejected the descriptor.
    #[error("failed to register descriptor {fd}: {source}")]
    Registration {
        fd: RawFd,
        #[source]
        source: io::Error,
    },

    /// The OS could not allocate a timer descriptor.
    #[error("failed to create timer: {0}")]
    TimerCreate(#[source] io::Error),

    /// The OS rejected a timer schedule.
    #[error("failed to program timer: {0}")]
    TimerProgram(#[source] io::Error),

    /// Waiting for readiness failed for a reason other than a signal.
    #[error("failed to wait for events: {0}")]
    Wait(#[source] io::Error),

    /// A timer's expiration counter could not be consumed.
    #[error("failed to read timer expirations: {0}")]
    TimerRead(#[source] io::Error),
}
