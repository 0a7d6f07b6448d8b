use std::time::{Duration, Instant};
use uev::Context;

fn main() -> uev::Result<()> {
    let _ = pretty_env_logger::try_init();

    let mut ctx = Context::new()?;
    let start = Instant::now();

    ctx.timer_create(Duration::from_millis(250), Duration::ZERO, move |_, _| {
        println!("[{:?}] one-shot timer fired", start.elapsed());
    })?;

    let mut ticks = 0;
    ctx.timer_create(Duration::ZERO, Duration::from_millis(100), move |ctx, w| {
        ticks += 1;
        println!("[{:?}] tick {ticks}", start.elapsed());

        if ticks == 5 {
            ctx.timer_delete(w).expect("timer is registered");
            ctx.exit();
        }
    })?;

    ctx.run()
}
