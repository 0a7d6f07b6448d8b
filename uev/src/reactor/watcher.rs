use super::core::Context;
use super::timer::Timer;
use crate::error::{Error, Result};
use crate::utils::Key;

use std::os::fd::RawFd;

/// Callback invoked when a watcher fires.
///
/// It receives the context that owns the watcher and the watcher's own
/// handle, and may register, rearm or delete watchers or stop the loop.
pub(crate) type Callback = Box<dyn FnMut(&mut Context, Watcher)>;

/// Readiness direction an I/O watcher is interested in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The descriptor is readable.
    Inbound,

    /// The descriptor is writable.
    Outbound,
}

/// What a watcher was registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatcherKind {
    /// Readiness of a caller-provided descriptor.
    File,

    /// Expiration of a timer owned by the watcher.
    Timer,
}

/// Opaque handle to a registered watcher.
///
/// The handle is only a reference: the [`Context`] owns the watcher itself.
/// Once the watcher is deleted, every copy of the handle goes stale and is
/// rejected with [`Error::InvalidArgument`], even if the slot is reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Watcher(pub(crate) Key);

/// The descriptor behind a watcher.
pub(crate) enum Source {
    /// Borrowed from the application, never closed by the context.
    File(RawFd),

    /// Owned; closed when the entry is dropped.
    Timer(Timer),
}

impl Source {
    pub(crate) fn fd(&self) -> RawFd {
        match self {
            Source::File(fd) => *fd,
            Source::Timer(timer) => timer.fd(),
        }
    }

    pub(crate) fn kind(&self) -> WatcherKind {
        match self {
            Source::File(_) => WatcherKind::File,
            Source::Timer(_) => WatcherKind::Timer,
        }
    }
}

/// A watcher registered in the context.
pub(crate) struct WatcherEntry {
    pub(crate) source: Source,

    pub(crate) direction: Direction,

    /// `None` only while the callback itself is running.
    pub(crate) callback: Option<Callback>,
}

impl Context {
    /// Registers interest in readiness of `fd`.
    ///
    /// `fd` stays owned by the caller: deleting the watcher removes the
    /// registration but never closes the descriptor. The caller must delete
    /// the watcher before closing `fd`.
    ///
    /// # Errors
    ///
    /// - [`Error::OutOfMemory`] if room for the watcher cannot be allocated.
    /// - [`Error::Registration`] if epoll rejects the descriptor. Nothing is
    ///   left registered in that case.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let watcher = ctx.io_create(fd, Direction::Inbound, |ctx, w| {
    ///     ctx.io_delete(w).unwrap();
    /// })?;
    /// ```
    pub fn io_create<F>(
        &mut self,
        fd: RawFd,
        direction: Direction,
        callback: F,
    ) -> Result<Watcher>
    where
        F: FnMut(&mut Context, Watcher) + 'static,
    {
        self.register(Source::File(fd), direction, Box::new(callback))
    }

    /// Deletes a watcher of any kind.
    ///
    /// The descriptor is removed from epoll on a best-effort basis, since the
    /// application may already have closed it. A timer watcher's descriptor
    /// is closed; a file watcher's is left alone.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `watcher` was already deleted.
    pub fn io_delete(&mut self, watcher: Watcher) -> Result<()> {
        let entry = self
            .watchers
            .remove(watcher.0)
            .ok_or(Error::InvalidArgument("watcher is not registered"))?;

        let fd = entry.source.fd();
        if let Err(e) = self.poller.deregister(fd) {
            log::warn!("failed to deregister fd {fd}: {e}");
        }

        log::debug!("deleted {:?} watcher on fd {fd}", entry.source.kind());

        Ok(())
    }

    /// Builds a watcher around `source` and registers it with epoll.
    ///
    /// The watcher joins the set only once epoll accepted it. On failure
    /// `source` is dropped, which closes it if it is owned.
    pub(crate) fn register(
        &mut self,
        source: Source,
        direction: Direction,
        callback: Callback,
    ) -> Result<Watcher> {
        let key = self.watchers.vacant_key()?;
        let fd = source.fd();

        self.poller
            .register(fd, key, direction)
            .map_err(|e| Error::Registration { fd, source: e })?;

        let kind = source.kind();
        let inserted = self.watchers.insert(WatcherEntry {
            source,
            direction,
            callback: Some(callback),
        });
        debug_assert_eq!(inserted, key);

        log::debug!("registered {kind:?} watcher on fd {fd} ({direction:?})");

        Ok(Watcher(key))
    }

    /// Returns `true` if `watcher` is still registered.
    pub fn contains(&self, watcher: Watcher) -> bool {
        self.watchers.contains(watcher.0)
    }

    /// Returns the kind of a registered watcher.
    pub fn kind(&self, watcher: Watcher) -> Option<WatcherKind> {
        self.watchers.get(watcher.0).map(|entry| entry.source.kind())
    }

    /// Returns the descriptor a registered watcher waits on.
    pub fn fd(&self, watcher: Watcher) -> Option<RawFd> {
        self.watchers.get(watcher.0).map(|entry| entry.source.fd())
    }

    /// Returns the readiness direction of a registered watcher.
    ///
    /// Timer watchers always report [`Direction::Inbound`].
    pub fn direction(&self, watcher: Watcher) -> Option<Direction> {
        self.watchers.get(watcher.0).map(|entry| entry.direction)
    }
}
