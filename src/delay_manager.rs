use std::thread;
use std::time::Duration;
use log::info;

/// Blocks the current thread between requests.
///
/// Backoff waits and the inter-page courtesy delay both go through this, so
/// a run can be driven without real sleeping.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        info!("Waiting for {:.1} seconds...", duration.as_secs_f64());
        thread::sleep(duration);
    }
}

/// Delay observed before every search page after the first one in a run.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Pause between sink batches.
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_millis(500);
