use super::core::Context;
use crate::error::Result;

/// Default number of events retrieved per wait.
const DEFAULT_MAX_EVENTS: usize = 10;

/// Builder for configuring and creating a [`Context`].
///
/// # Examples
///
/// ```rust,ignore
/// let ctx = ContextBuilder::new()
///     .max_events(32)
///     .build()?;
/// ```
pub struct ContextBuilder {
    /// Capacity of the event buffer filled by each wait.
    max_events: usize,

    /// Whether the epoll and timer descriptors are created close-on-exec.
    close_on_exec: bool,
}

impl ContextBuilder {
    /// Creates a new `ContextBuilder` with default configuration.
    ///
    /// By default up to 10 events are retrieved per wait and descriptors
    /// are created close-on-exec.
    pub fn new() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS,
            close_on_exec: true,
        }
    }

    /// Sets how many ready events a single wait may return.
    ///
    /// Further ready watchers are reported by the next wait.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0` or if `n` does not fit in an `i32`.
    pub fn max_events(mut self, n: usize) -> Self {
        assert!(n > 0, "max_events must be > 0");
        assert!(n <= i32::MAX as usize, "max_events must fit in an i32");

        self.max_events = n;
        self
    }

    /// Sets whether the epoll instance and timer descriptors are closed
    /// across `exec`.
    pub fn close_on_exec(mut self, enabled: bool) -> Self {
        self.close_on_exec = enabled;
        self
    }

    /// Builds the context with the configured options.
    ///
    /// # Errors
    ///
    /// [`Error::Resource`](crate::Error::Resource) if the epoll instance or
    /// the event buffer cannot be allocated.
    pub fn build(self) -> Result<Context> {
        Context::with_config(self.max_events, self.close_on_exec)
    }
}

impl Default for ContextBuilder {
    /// Creates a default `ContextBuilder`.
    fn default() -> Self {
        Self::new()
    }
}
