use crate::utils::Key;

/// A readiness event reported by the poller.
///
/// An `Event` carries the key that was attached to the descriptor when it
/// was registered. The context resolves it back to the originating watcher;
/// keys of watchers deleted since the wait returned no longer resolve.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Event {
    /// Key of the watcher the event belongs to.
    pub(crate) key: Key,
}
