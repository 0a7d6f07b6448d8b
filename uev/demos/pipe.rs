use std::os::fd::RawFd;
use std::time::Duration;
use uev::{Context, Direction};

fn main() -> uev::Result<()> {
    let _ = pretty_env_logger::try_init();

    let mut fds = [0 as RawFd; 2];
    if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) } < 0 {
        return Err(uev::Error::Resource(std::io::Error::last_os_error()));
    }
    let [rx, tx] = fds;

    let mut ctx = Context::new()?;

    let mut sent = 0u8;
    ctx.timer_create(Duration::from_millis(50), Duration::from_millis(50), move |ctx, w| {
        sent += 1;
        unsafe { libc::write(tx, &sent as *const u8 as *const _, 1) };

        if sent == 3 {
            let _ = ctx.timer_delete(w);
        }
    })?;

    ctx.io_create(rx, Direction::Inbound, move |ctx, _| {
        let mut buf = [0u8; 16];
        let n = unsafe { libc::read(rx, buf.as_mut_ptr() as *mut _, buf.len()) };

        for byte in buf.iter().take(n.max(0) as usize) {
            println!("received {byte}");

            if *byte == 3 {
                ctx.exit();
            }
        }
    })?;

    let result = ctx.run();

    drop(ctx);
    unsafe {
        libc::close(rx);
        libc::close(tx);
    }

    result
}
