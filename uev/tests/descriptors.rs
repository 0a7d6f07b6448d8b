use std::cell::RefCell;
use std::fs;
use std::os::fd::RawFd;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Duration;

use uev::{Context, Direction, Error};

// Descriptor counts are per process: tests in this file must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn init() {
    let _ = pretty_env_logger::try_init();
}

fn open_fds() -> usize {
    fs::read_dir("/proc/self/fd").unwrap().count()
}

fn pipe() -> (RawFd, RawFd) {
    let mut fds = [0; 2];
    let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
    assert_eq!(rc, 0, "pipe2 failed");

    (fds[0], fds[1])
}

fn is_open(fd: RawFd) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

fn close(fds: &[RawFd]) {
    for &fd in fds {
        unsafe { libc::close(fd) };
    }
}

#[test]
fn test_dropping_the_context_closes_owned_descriptors() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    init();

    let before = open_fds();

    let (rx, tx) = pipe();
    let mut ctx = Context::new().unwrap();

    ctx.io_create(rx, Direction::Inbound, |_, _| {}).unwrap();
    let one_shot = ctx
        .timer_create(Duration::from_secs(1), Duration::ZERO, |_, _| {})
        .unwrap();
    let recurring = ctx
        .timer_create(Duration::ZERO, Duration::from_secs(1), |_, _| {})
        .unwrap();

    let timer_fds = [ctx.fd(one_shot).unwrap(), ctx.fd(recurring).unwrap()];
    assert!(timer_fds.iter().all(|&fd| is_open(fd)));

    // Epoll instance, two timers and the pipe.
    assert_eq!(open_fds(), before + 5);

    drop(ctx);

    assert!(timer_fds.iter().all(|&fd| !is_open(fd)));
    assert!(is_open(rx));
    assert!(is_open(tx));
    assert_eq!(open_fds(), before + 2);

    close(&[rx, tx]);
    assert_eq!(open_fds(), before);
}

#[test]
fn test_rejected_timer_closes_its_descriptor() {
    let _serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    init();

    let mut ctx = Context::new().unwrap();
    let counts = Rc::new(RefCell::new(None));

    let slot = counts.clone();
    ctx.timer_create(Duration::ZERO, Duration::ZERO, move |ctx, _| {
        let before = open_fds();
        let result = ctx.timer_create(Duration::MAX, Duration::ZERO, |_, _| {});
        let after = open_fds();

        assert!(matches!(result, Err(Error::TimerProgram(_))));
        *slot.borrow_mut() = Some((before, after));
        ctx.exit();
    })
    .unwrap();

    ctx.run().unwrap();

    let (before, after) = counts.borrow_mut().take().expect("callback never ran");
    assert_eq!(after, before);
    assert!(ctx.is_empty());
}
