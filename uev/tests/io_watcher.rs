use std::cell::Cell;
use std::os::fd::RawFd;
use std::rc::Rc;

use uev::{Context, ContextBuilder, Direction, Error, WatcherKind};

fn init() {
    let _ = pretty_env_logger::try_init();
}

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
    assert_eq!(rc, 0, "pipe2 failed");

    (fds[0], fds[1])
}

fn write_byte(fd: RawFd) {
    let n = unsafe { libc::write(fd, b"x".as_ptr() as *const _, 1) };
    assert_eq!(n, 1);
}

fn read_byte(fd: RawFd) -> bool {
    let mut buf = [0u8; 1];
    unsafe { libc::read(fd, buf.as_mut_ptr() as *mut _, 1) == 1 }
}

fn close(fds: &[RawFd]) {
    for &fd in fds {
        unsafe { libc::close(fd) };
    }
}

#[test]
fn test_inbound_watcher_fires_on_pipe_data() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    let watcher = ctx
        .io_create(rx, Direction::Inbound, move |ctx, w| {
            counter.set(counter.get() + 1);
            assert_eq!(ctx.fd(w), Some(rx));
            assert!(read_byte(rx));
            ctx.exit();
        })
        .unwrap();

    assert_eq!(ctx.kind(watcher), Some(WatcherKind::File));
    assert_eq!(ctx.direction(watcher), Some(Direction::Inbound));

    write_byte(tx);
    ctx.run().unwrap();

    assert_eq!(calls.get(), 1);
    assert!(ctx.contains(watcher));
    assert!(!ctx.is_running());

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_unread_data_fires_again_on_next_iteration() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    ctx.io_create(rx, Direction::Inbound, move |ctx, _| {
        counter.set(counter.get() + 1);

        // Leave the byte in the pipe the first time around.
        if counter.get() == 2 {
            assert!(read_byte(rx));
            ctx.exit();
        }
    })
    .unwrap();

    write_byte(tx);
    ctx.run().unwrap();

    assert_eq!(calls.get(), 2);

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_outbound_watcher_fires_when_writable() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();
    let calls = Rc::new(Cell::new(0));

    let counter = calls.clone();
    ctx.io_create(tx, Direction::Outbound, move |ctx, w| {
        counter.set(counter.get() + 1);
        ctx.io_delete(w).unwrap();
        ctx.exit();
    })
    .unwrap();

    ctx.run().unwrap();

    assert_eq!(calls.get(), 1);
    assert!(ctx.is_empty());

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_invalid_descriptor_is_rejected_without_registration() {
    init();

    let mut ctx = Context::new().unwrap();

    let err = ctx.io_create(-1, Direction::Inbound, |_, _| {}).unwrap_err();

    assert!(matches!(err, Error::Registration { fd: -1, .. }));
    assert!(ctx.is_empty());
}

#[test]
fn test_registering_the_same_descriptor_twice_fails() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();

    ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap();
    let err = ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap_err();

    assert!(matches!(err, Error::Registration { .. }));
    assert_eq!(ctx.len(), 1);

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_deleted_descriptor_can_be_registered_again() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();

    for _ in 0..3 {
        let watcher = ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap();
        assert_eq!(ctx.len(), 1);

        ctx.io_delete(watcher).unwrap();
        assert!(ctx.is_empty());
    }

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_stale_handle_is_rejected_after_slot_reuse() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();

    let old = ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap();
    ctx.io_delete(old).unwrap();

    let new = ctx.io_create(tx, Direction::Outbound, |_, _| {}).unwrap();

    assert!(matches!(ctx.io_delete(old), Err(Error::InvalidArgument(_))));
    assert!(!ctx.contains(old));
    assert_eq!(ctx.fd(old), None);
    assert!(ctx.contains(new));
    assert_eq!(ctx.fd(new), Some(tx));

    drop(ctx);
    close(&[rx, tx]);
}

#[test]
fn test_deleting_a_closed_descriptor_still_succeeds() {
    init();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();

    let watcher = ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap();
    close(&[rx]);

    ctx.io_delete(watcher).unwrap();
    assert!(ctx.is_empty());

    drop(ctx);
    close(&[tx]);
}

#[test]
fn test_small_event_buffer_spreads_ready_watchers_over_waits() {
    init();

    let (rx1, tx1) = pipe();
    let (rx2, tx2) = pipe();
    let mut ctx = ContextBuilder::new().max_events(1).build().unwrap();
    let calls = Rc::new(Cell::new(0));

    for rx in [rx1, rx2] {
        let counter = calls.clone();
        ctx.io_create(rx, Direction::Inbound, move |ctx, w| {
            assert!(read_byte(rx));
            ctx.io_delete(w).unwrap();

            counter.set(counter.get() + 1);
            if counter.get() == 2 {
                ctx.exit();
            }
        })
        .unwrap();
    }

    write_byte(tx1);
    write_byte(tx2);
    ctx.run().unwrap();

    assert_eq!(calls.get(), 2);
    assert!(ctx.is_empty());

    drop(ctx);
    close(&[rx1, tx1, rx2, tx2]);
}
