//! Linux `epoll`-based poller implementation.
//!
//! Responsibilities:
//! - Register file descriptors for inbound or outbound readiness
//! - Tag every registration with the owning watcher's key
//! - Block, without timeout, until at least one descriptor is ready
//!
//! The poller is level-triggered: a descriptor with unread data is reported
//! again on every wait.

use super::platform::{sys_close, sys_epoll_create};
use crate::reactor::event::Event;
use crate::reactor::watcher::Direction;
use crate::utils::Key;

use libc::{
    EPOLL_CTL_ADD, EPOLL_CTL_DEL, EPOLLIN, EPOLLOUT, epoll_ctl, epoll_event, epoll_wait,
};
use std::io;
use std::os::fd::RawFd;

/// Linux `epoll` poller.
///
/// This poller owns:
/// - an `epoll` instance,
/// - a fixed-size event buffer, sized once at creation.
pub(crate) struct EpollPoller {
    /// Epoll file descriptor.
    epoll: RawFd,

    /// Reusable buffer for epoll events.
    events: Vec<epoll_event>,
}

impl EpollPoller {
    /// Create a new `EpollPoller` able to report `max_events` events per wait.
    ///
    /// The epoll descriptor is closed again if the event buffer cannot be
    /// allocated.
    pub(crate) fn new(max_events: usize, cloexec: bool) -> io::Result<Self> {
        let epoll = sys_epoll_create(cloexec)?;

        let mut events = Vec::new();
        if let Err(e) = events.try_reserve_exact(max_events) {
            sys_close(epoll);
            return Err(io::Error::new(io::ErrorKind::OutOfMemory, e));
        }
        events.resize(max_events, epoll_event { events: 0, u64: 0 });

        Ok(Self { epoll, events })
    }

    /// Register a file descriptor with the poller.
    ///
    /// `key` is stored as the registration's user data and handed back in
    /// every [`Event`] for this descriptor.
    pub(crate) fn register(&self, fd: RawFd, key: Key, direction: Direction) -> io::Result<()> {
        let flags = match direction {
            Direction::Inbound => EPOLLIN,
            Direction::Outbound => EPOLLOUT,
        };

        let mut event = epoll_event {
            events: flags as u32,
            u64: key.to_token(),
        };

        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_ADD, fd, &mut event) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Remove a file descriptor from the poller.
    pub(crate) fn deregister(&self, fd: RawFd) -> io::Result<()> {
        let rc = unsafe { epoll_ctl(self.epoll, EPOLL_CTL_DEL, fd, std::ptr::null_mut()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(())
    }

    /// Block until at least one registered descriptor is ready.
    ///
    /// Waits triggered by a signal are retried transparently. On success
    /// `events` holds this batch, replacing whatever it held before.
    pub(crate) fn poll(&mut self, events: &mut Vec<Event>) -> io::Result<()> {
        let n = loop {
            let n = unsafe {
                epoll_wait(
                    self.epoll,
                    self.events.as_mut_ptr(),
                    self.events.len() as i32,
                    -1,
                )
            };

            if n >= 0 {
                break n as usize;
            }

            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                log::trace!("epoll_wait interrupted by a signal, retrying");
                continue;
            }

            return Err(err);
        };

        events.clear();
        events.extend(self.events[..n].iter().map(|ev| Event {
            key: Key::from_token(ev.u64),
        }));

        Ok(())
    }
}

impl Drop for EpollPoller {
    fn drop(&mut self) {
        sys_close(self.epoll);
    }
}
