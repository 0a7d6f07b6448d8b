use libc::{
    CLOCK_MONOTONIC, EPOLL_CLOEXEC, TFD_CLOEXEC, TFD_NONBLOCK, c_int, close, epoll_create1,
    itimerspec, read, time_t, timerfd_create, timerfd_settime, timespec,
};
use std::os::fd::RawFd;
use std::time::Duration;
use std::{io, mem};

/// Reads from a file descriptor into the given buffer.
///
/// Returns the number of bytes read, or a negative value on error.
pub(crate) fn sys_read(fd: RawFd, buffer: &mut [u8]) -> isize {
    unsafe { read(fd, buffer.as_mut_ptr() as *mut _, buffer.len()) }
}

/// Closes a file descriptor.
pub(crate) fn sys_close(fd: RawFd) {
    unsafe { close(fd) };
}

/// Creates an epoll instance.
pub(crate) fn sys_epoll_create(cloexec: bool) -> io::Result<RawFd> {
    let flags = if cloexec { EPOLL_CLOEXEC } else { 0 };

    let fd = unsafe { epoll_create1(flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(fd)
}

/// Creates a non-blocking timer descriptor on the monotonic clock.
pub(crate) fn sys_timerfd_create(cloexec: bool) -> io::Result<RawFd> {
    let mut flags: c_int = TFD_NONBLOCK;
    if cloexec {
        flags |= TFD_CLOEXEC;
    }

    let fd = unsafe { timerfd_create(CLOCK_MONOTONIC, flags) };
    if fd < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(fd)
}

/// Programs a timer descriptor with a relative first expiration and an
/// interval.
///
/// A zero `value` disarms the timer; a zero `interval` makes it one-shot.
pub(crate) fn sys_timerfd_settime(
    fd: RawFd,
    value: Duration,
    interval: Duration,
) -> io::Result<()> {
    let mut spec: itimerspec = unsafe { mem::zeroed() };
    spec.it_value = duration_to_timespec(value)?;
    spec.it_interval = duration_to_timespec(interval)?;

    let rc = unsafe { timerfd_settime(fd, 0, &spec, std::ptr::null_mut()) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

/// Converts a [`Duration`] into a `timespec`.
///
/// Fails with [`io::ErrorKind::InvalidInput`] when the seconds do not fit in
/// `time_t`.
pub(crate) fn duration_to_timespec(duration: Duration) -> io::Result<timespec> {
    let seconds = time_t::try_from(duration.as_secs()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            "duration does not fit in a timespec",
        )
    })?;

    let mut ts: timespec = unsafe { mem::zeroed() };
    ts.tv_sec = seconds;
    ts.tv_nsec = duration.subsec_nanos() as _;

    Ok(ts)
}
