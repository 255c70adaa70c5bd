use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Shared stop request, raised by the interrupt handler and observed by the
/// orchestrator at warm-up ticks, loop boundaries and sleeps.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.inner;
        *lock(flag) = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.0)
    }

    /// Block for up to `duration`, returning early if cancelled.
    ///
    /// Returns `true` when the token was (or became) cancelled.
    pub fn wait(&self, duration: Duration) -> bool {
        let (flag, wakeup) = &*self.inner;
        let deadline = Instant::now() + duration;
        let mut cancelled = lock(flag);

        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = match wakeup.wait_timeout(cancelled, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        true
    }
}

fn lock(flag: &Mutex<bool>) -> MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
