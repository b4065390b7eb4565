//! A counting semaphore used for pool/queue back-pressure and for the
//! timer's cancellable absolute-deadline sleep.
//!
//! The standard library has no semaphore type, so this hand-rolls one
//! in terms of a count guarded by a [`parking_lot::Mutex`] with a
//! [`parking_lot::Condvar`] for waiters. `post` always notifies one
//! waiter; `wait` blocks until the count is positive then decrements it.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, SystemTime};

pub struct Semaphore {
    count: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the count is positive, then decrements it.
    pub fn wait(&self) {
        let mut count = self.count.lock();
        while *count == 0 {
            self.cond.wait(&mut count);
        }
        *count -= 1;
    }

    /// Increments the count and wakes one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.cond.notify_one();
    }

    /// Current count, for diagnostics (mirrors `sem_getvalue`). Not
    /// meant to gate correctness; only the warmup poll in the display
    /// scheduler uses it, where a racy read is acceptable.
    pub fn value(&self) -> usize {
        *self.count.lock()
    }

    /// Blocks until the count is positive (decrementing it) or until
    /// `deadline` (wall-clock) passes, whichever comes first. Returns
    /// `true` if acquired, `false` on timeout. A `deadline` already in
    /// the past returns immediately, mirroring `sem_timedwait`'s
    /// behaviour of not blocking at all in that case.
    pub fn wait_until(&self, deadline: SystemTime) -> bool {
        let mut count = self.count.lock();
        loop {
            if *count > 0 {
                *count -= 1;
                return true;
            }

            let remaining = match deadline.duration_since(SystemTime::now()) {
                Ok(d) => d,
                Err(_) => return false,
            };

            let (guard, timed_out) = self.cond.wait_for(&mut count, remaining);
            count = guard;
            if timed_out.timed_out() && *count == 0 {
                return false;
            }
        }
    }
}

/// Spins in 100ms polls until `predicate` returns `true`. Used only for
/// the display scheduler's warmup wait (spec §4.D step 1), where polling
/// the free semaphore's value is the documented behaviour rather than a
/// blocking wait (there is no single event that fires "pool primed").
pub fn poll_until(mut predicate: impl FnMut() -> bool) {
    while !predicate() {
        std::thread::sleep(Duration::from_millis(100));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_wait_post_roundtrip() {
        let sem = Semaphore::new(1);
        sem.wait();
        assert_eq!(sem.value(), 0);
        sem.post();
        assert_eq!(sem.value(), 1);
    }

    #[test]
    fn test_blocks_until_posted() {
        let sem = Arc::new(Semaphore::new(0));
        let sem2 = sem.clone();
        let handle = std::thread::spawn(move || {
            sem2.wait();
        });

        std::thread::sleep(Duration::from_millis(50));
        sem.post();
        handle.join().expect("waiter thread panicked");
    }

    #[test]
    fn test_wait_until_times_out() {
        let sem = Semaphore::new(0);
        let deadline = SystemTime::now() + Duration::from_millis(20);
        assert!(!sem.wait_until(deadline));
    }

    #[test]
    fn test_wait_until_acquires_before_deadline() {
        let sem = Arc::new(Semaphore::new(0));
        let sem2 = sem.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sem2.post();
        });

        let deadline = SystemTime::now() + Duration::from_secs(2);
        assert!(sem.wait_until(deadline));
    }

    #[test]
    fn test_wait_until_past_deadline_returns_immediately() {
        let sem = Semaphore::new(0);
        let deadline = SystemTime::now() - Duration::from_secs(1);
        assert!(!sem.wait_until(deadline));
    }

    #[test]
    fn test_poll_until() {
        let flag = Arc::new(parking_lot::Mutex::new(false));
        let flag2 = flag.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            *flag2.lock() = true;
        });
        poll_until(|| *flag.lock());
        assert!(*flag.lock());
    }
}
