use super::core::Context;
use super::poller::platform::{sys_close, sys_read, sys_timerfd_create, sys_timerfd_settime};
use super::watcher::{Direction, Source, Watcher, WatcherEntry};
use crate::error::{Error, Result};

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Shortest first expiration a timer can be programmed with.
///
/// A zero initial expiration would disarm the timerfd instead of firing it.
const IMMEDIATE: Duration = Duration::from_nanos(1);

/// A timerfd owned by a timer watcher.
///
/// The timer remembers its schedule so the loop can (re)program it when it
/// starts. The descriptor is closed on drop.
pub(crate) struct Timer {
    /// The timer descriptor.
    fd: RawFd,

    /// Delay before the first expiration.
    pub(crate) timeout: Duration,

    /// Interval between later expirations, zero for a one-shot timer.
    pub(crate) period: Duration,

    /// Bumped every time the descriptor is programmed.
    arms: u64,
}

impl Timer {
    fn new(cloexec: bool) -> io::Result<Self> {
        let fd = sys_timerfd_create(cloexec)?;

        Ok(Self {
            fd,
            timeout: Duration::ZERO,
            period: Duration::ZERO,
            arms: 0,
        })
    }

    pub(crate) fn fd(&self) -> RawFd {
        self.fd
    }

    pub(crate) fn is_one_shot(&self) -> bool {
        self.period.is_zero()
    }

    /// Number of times the descriptor has been programmed.
    ///
    /// Programming clears the expiration counter, so a change across a
    /// callback means there is nothing stale left to drain.
    pub(crate) fn arms(&self) -> u64 {
        self.arms
    }

    /// Programs the descriptor with the stored schedule, counting from now.
    fn arm(&mut self) -> io::Result<()> {
        sys_timerfd_settime(self.fd, self.timeout.max(IMMEDIATE), self.period)?;
        self.arms = self.arms.wrapping_add(1);

        Ok(())
    }

    fn disarm(&self) -> io::Result<()> {
        sys_timerfd_settime(self.fd, Duration::ZERO, Duration::ZERO)
    }

    /// Consumes the expiration counter.
    ///
    /// Returns `Ok(None)` when nothing is pending, which is the case after
    /// the timer was reprogrammed since it last fired.
    pub(crate) fn drain(&self) -> io::Result<Option<u64>> {
        let mut buffer = [0u8; 8];
        let n = sys_read(self.fd, &mut buffer);

        if n == buffer.len() as isize {
            return Ok(Some(u64::from_ne_bytes(buffer)));
        }

        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::WouldBlock {
                return Ok(None);
            }
            return Err(err);
        }

        Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read of {n} bytes from timer"),
        ))
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        sys_close(self.fd);
    }
}

impl Context {
    /// Creates a timer watcher.
    ///
    /// The timer first expires `timeout` after it is armed, then every
    /// `period`. A zero `period` makes a one-shot timer, deleted by the loop
    /// right after its callback ran. A zero `timeout` fires as soon as
    /// possible.
    ///
    /// Timers created before [`run`](Context::run) are only armed when the
    /// loop starts, so their deadlines count from loop start.
    ///
    /// # Errors
    ///
    /// - [`Error::TimerCreate`] if no timer descriptor could be allocated.
    /// - [`Error::OutOfMemory`] or [`Error::Registration`] if the watcher
    ///   could not be registered.
    /// - [`Error::TimerProgram`] if the schedule was rejected.
    ///
    /// The timer descriptor is closed on every failure path.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// ctx.timer_create(Duration::ZERO, Duration::from_millis(50), |_, _| {
    ///     println!("tick");
    /// })?;
    /// ```
    pub fn timer_create<F>(
        &mut self,
        timeout: Duration,
        period: Duration,
        callback: F,
    ) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher) + 'static,
    {
        let timer = Timer::new(self.cloexec).map_err(Error::TimerCreate)?;
        let watcher =
            self.register(Source::Timer(timer), Direction::Inbound, Box::new(callback))?;

        if let Err(e) = self.timer_set(watcher, timeout, period) {
            self.io_delete(watcher)?;
            return Err(e);
        }

        Ok(watcher)
    }

    /// Reschedules a timer watcher.
    ///
    /// The new schedule is always stored. While the loop runs the timer is
    /// reprogrammed at once, counting from now; otherwise programming waits
    /// for [`run`](Context::run). Calling this from the timer's own callback
    /// affects the next expiration, not the one being handled.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `watcher` is stale or not a timer.
    /// - [`Error::TimerProgram`] if the OS rejected the schedule.
    pub fn timer_set(
        &mut self,
        watcher: Watcher,
        timeout: Duration,
        period: Duration,
    ) -> Result<()> {
        let running = self.running;
        let timer = self.timer_mut(watcher)?;

        timer.timeout = timeout;
        timer.period = period;

        if !running {
            return Ok(());
        }

        timer.arm().map_err(Error::TimerProgram)
    }

    /// Disarms and deletes a timer watcher, closing its descriptor.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `watcher` is stale or not a timer.
    pub fn timer_delete(&mut self, watcher: Watcher) -> Result<()> {
        let timer = self.timer_mut(watcher)?;

        if let Err(e) = timer.disarm() {
            log::warn!("failed to disarm timer fd {}: {e}", timer.fd());
        }

        self.io_delete(watcher)
    }

    /// Returns the stored `(timeout, period)` of a timer watcher.
    pub fn timer_schedule(&self, watcher: Watcher) -> Option<(Duration, Duration)> {
        match &self.watchers.get(watcher.0)?.source {
            Source::Timer(timer) => Some((timer.timeout, timer.period)),
            Source::File(_) => None,
        }
    }

    /// Programs every registered timer with its stored schedule.
    pub(crate) fn arm_timers(&mut self) -> Result<()> {
        for key in self.watchers.keys() {
            let entry = self.watchers.get_mut(key);

            if let Some(WatcherEntry {
                source: Source::Timer(timer),
                ..
            }) = entry
            {
                timer.arm().map_err(Error::TimerProgram)?;
            }
        }

        Ok(())
    }

    fn timer_mut(&mut self, watcher: Watcher) -> Result<&mut Timer> {
        let entry = self
            .watchers
            .get_mut(watcher.0)
            .ok_or(Error::InvalidArgument("watcher is not registered"))?;

        match &mut entry.source {
            Source::Timer(timer) => Ok(timer),
            Source::File(_) => Err(Error::InvalidArgument("watcher is not a timer")),
        }
    }
}
