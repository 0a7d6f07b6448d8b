//! Reactor core and event dispatch.
//!
//! This module implements the event loop itself:
//! - the [`Context`] owning the epoll instance and every watcher,
//! - I/O watchers on caller-owned descriptors,
//! - timer watchers backed by timerfd,
//! - the dispatch loop turning readiness into callbacks.
//!
//! Everything runs on the thread calling [`Context::run`]; callbacks run to
//! completion one after the other.

mod builder;
mod core;
mod event;
mod poller;
mod timer;
mod watcher;

pub use builder::ContextBuilder;
pub use core::Context;
pub use watcher::{Direction, Watcher, WatcherKind};
