use super::builder::ContextBuilder;
use super::event::Event;
use super::poller::Poller;
use super::watcher::{Source, Watcher, WatcherEntry, WatcherKind};
use crate::error::{Error, Result};
use crate::utils::Slab;

use std::{io, mem};

/// A single-threaded event loop.
///
/// `Context` is responsible for:
/// - owning the epoll instance and its event buffer,
/// - owning every watcher registered against it,
/// - running the dispatch loop that turns readiness into callbacks.
///
/// Dropping the context deletes every remaining watcher, closing the timer
/// descriptors it owns, and then closes the epoll instance.
pub struct Context {
    /// Readiness multiplexer.
    pub(crate) poller: Poller,

    /// Events of the batch being dispatched, sized to the wait capacity.
    events: Vec<Event>,

    /// Every registered watcher, in lock-step with the epoll interest list.
    pub(crate) watchers: Slab<WatcherEntry>,

    /// Cleared by [`exit`](Self::exit) or a fatal failure; checked once per
    /// iteration.
    pub(crate) running: bool,

    /// Whether owned descriptors are created close-on-exec.
    pub(crate) cloexec: bool,
}

impl Context {
    /// Creates a context with the default configuration.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`] if the epoll instance or the event buffer cannot
    /// be allocated.
    pub fn new() -> Result<Self> {
        ContextBuilder::new().build()
    }

    pub(crate) fn with_config(max_events: usize, cloexec: bool) -> Result<Self> {
        let poller = Poller::new(max_events, cloexec).map_err(Error::Resource)?;

        let mut events = Vec::new();
        events
            .try_reserve_exact(max_events)
            .map_err(|e| Error::Resource(io::Error::new(io::ErrorKind::OutOfMemory, e)))?;

        log::debug!("created event loop context (max_events={max_events})");

        Ok(Self {
            poller,
            events,
            watchers: Slab::new(),
            running: false,
            cloexec,
        })
    }

    /// Runs the event loop until [`exit`](Self::exit) is called or a fatal
    /// error occurs.
    ///
    /// Timers configured before the call are armed first, so their deadlines
    /// count from loop start. Each iteration then blocks until at least one
    /// watcher is ready and invokes the callback of every ready watcher. A
    /// fired timer has its expiration counter consumed, and a one-shot timer
    /// is deleted right after its callback.
    ///
    /// The loop blocks indefinitely: with no registered watchers it only
    /// returns on error.
    ///
    /// # Errors
    ///
    /// - [`Error::TimerProgram`] if a timer could not be armed at loop start.
    /// - [`Error::Wait`] if waiting failed for a reason other than a signal.
    /// - [`Error::TimerRead`] if a timer's expiration counter could not be
    ///   read. The rest of the batch is still dispatched.
    pub fn run(&mut self) -> Result<()> {
        self.running = true;

        if let Err(e) = self.arm_timers() {
            self.running = false;
            return Err(e);
        }

        let mut failure = None;

        while self.running {
            if let Err(e) = self.poller.poll(&mut self.events) {
                log::warn!("event loop stopped: {e}");
                self.running = false;
                failure = Some(Error::Wait(e));
                break;
            }

            log::trace!("{} watcher(s) ready", self.events.len());

            // A callback may run the loop again, which refills the buffer.
            let batch = mem::take(&mut self.events);

            for &event in &batch {
                if let Err(e) = self.dispatch(event) {
                    log::warn!("event loop stopping: {e}");
                    self.running = false;
                    failure.get_or_insert(e);
                }
            }

            self.events = batch;
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Requests the loop to stop.
    ///
    /// The request is observed at the next iteration boundary: the current
    /// batch of events is still dispatched, but no further wait happens.
    pub fn exit(&mut self) {
        self.running = false;
    }

    /// Returns `true` while [`run`](Self::run) is looping.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns the number of registered watchers.
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    /// Returns `true` if no watcher is registered.
    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Handles one ready event.
    ///
    /// The callback is taken out of its watcher while it runs, so it can
    /// freely use the context, including deleting its own watcher.
    fn dispatch(&mut self, event: Event) -> Result<()> {
        let watcher = Watcher(event.key);

        let Some(entry) = self.watchers.get_mut(event.key) else {
            log::trace!("skipping event for deleted watcher {watcher:?}");
            return Ok(());
        };

        let arms = match &entry.source {
            Source::Timer(timer) => timer.arms(),
            Source::File(_) => 0,
        };

        if let Some(mut callback) = entry.callback.take() {
            callback(self, watcher);

            if let Some(entry) = self.watchers.get_mut(event.key) {
                entry.callback = Some(callback);
            }
        }

        let Some(WatcherEntry {
            source: Source::Timer(timer),
            ..
        }) = self.watchers.get(event.key)
        else {
            return Ok(());
        };

        // Rearmed by its callback: the counter was cleared, and anything
        // pending now belongs to the new schedule.
        let drained = if timer.arms() == arms {
            timer.drain()
        } else {
            Ok(None)
        };

        if timer.is_one_shot() {
            self.timer_delete(watcher)?;
        }

        match drained {
            Ok(expirations) => {
                log::trace!("timer {watcher:?} expirations: {expirations:?}");
                Ok(())
            }
            Err(e) => Err(Error::TimerRead(e)),
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        for key in self.watchers.keys() {
            let watcher = Watcher(key);

            let deleted = match self.kind(watcher) {
                Some(WatcherKind::Timer) => self.timer_delete(watcher),
                _ => self.io_delete(watcher),
            };

            if let Err(e) = deleted {
                log::warn!("failed to delete watcher {watcher:?}: {e}");
            }
        }

        log::debug!("destroyed event loop context");
    }
}
