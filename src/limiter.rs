use crate::common::*;

/// A counting semaphore that bounds the number of concurrently running page tasks.
#[derive(Debug)]
pub struct Limiter {
    permits: Mutex<usize>,
    released: Condvar,
    max_permits: usize,
}

impl Limiter {
    /// Creates a limiter with `max_permits` initial permits. Zero is treated as 1.
    pub fn new(max_permits: usize) -> Self {
        let max_permits = cmp::max(max_permits, 1);
        Self {
            permits: Mutex::new(max_permits),
            released: Condvar::new(),
            max_permits,
        }
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    pub fn available(&self) -> usize {
        *self.permits.lock()
    }

    /// Takes a permit, blocking the caller until one is available.
    ///
    /// The permit is returned when the guard is dropped.
    pub fn acquire(&self) -> Permit<'_> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.released.wait(&mut permits);
        }
        *permits -= 1;
        Permit { limiter: self }
    }

    /// Takes a permit if one is available without blocking.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return None;
        }
        *permits -= 1;
        Some(Permit { limiter: self })
    }

    fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        debug_assert!(*permits <= self.max_permits);
        drop(permits);
        self.released.notify_one();
    }
}

/// A permit held on a [Limiter].
#[derive(Debug)]
#[must_use = "the permit is released as soon as it is dropped"]
pub struct Permit<'a> {
    limiter: &'a Limiter,
}

impl Permit<'_> {
    /// Returns the permit to the limiter.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

/// A cooperative cancellation flag shared between the dispatcher and page tasks.
///
/// Cancelling stops further pages from being dispatched. Pages already running are
/// not interrupted, but may poll [is_cancelled()](CancelToken::is_cancelled) themselves.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::atomic::AtomicUsize, thread, time::Duration};

    #[test]
    fn permits_are_returned_on_drop() {
        let limiter = Limiter::new(2);
        let first = limiter.acquire();
        let second = limiter.acquire();
        assert_eq!(limiter.available(), 0);
        assert!(limiter.try_acquire().is_none());

        first.release();
        assert_eq!(limiter.available(), 1);
        drop(second);
        assert_eq!(limiter.available(), 2);
    }

    #[test]
    fn zero_permits_coerced_to_one() {
        let limiter = Limiter::new(0);
        assert_eq!(limiter.max_permits(), 1);
        let _permit = limiter.acquire();
        assert!(limiter.try_acquire().is_none());
    }

    #[test]
    fn concurrency_never_exceeds_permits() {
        let limiter = Limiter::new(3);
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        crossbeam::scope(|scope| {
            for _ in 0..16 {
                let permit = limiter.acquire();
                let running = &running;
                let peak = &peak;

                scope.spawn(move |_| {
                    let now = running.fetch_add(1, SeqCst) + 1;
                    peak.fetch_max(now, SeqCst);
                    thread::sleep(Duration::from_millis(5));
                    running.fetch_sub(1, SeqCst);
                    drop(permit);
                });
            }
        })
        .unwrap();

        assert!(peak.load(SeqCst) <= 3);
        assert_eq!(limiter.available(), 3);
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let cloned = token.clone();
        assert!(!cloned.is_cancelled());
        token.cancel();
        assert!(cloned.is_cancelled());
    }
}
