//! `system`: a plain wall-clock `Timer`, for single-display playback with
//! no cross-process synchronisation. `player-netsync`'s `NetsyncTimer` is
//! the barrier-backed alternative used for coordinated multi-display
//! playback.

use player_core::driver::Timer;
use player_core::error::Result;
use player_core::Semaphore;
use std::time::SystemTime;

/// Reference name this driver registers under.
pub const NAME: &str = "system";

pub struct SystemTimer {
    /// Posted by `close()` to cancel an in-progress `wait`.
    cancel: Semaphore,
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self {
            cancel: Semaphore::new(0),
        }
    }
}

impl SystemTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for SystemTimer {
    fn open(&mut self, _params: Option<&str>) -> Result<()> {
        Ok(())
    }

    fn start(&mut self) -> Result<SystemTime> {
        Ok(SystemTime::now())
    }

    fn read(&self) -> SystemTime {
        SystemTime::now()
    }

    fn wait(&self, deadline: SystemTime) -> bool {
        !self.cancel.wait_until(deadline)
    }

    fn close(&mut self) {
        self.cancel.post();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_start_returns_now() {
        let mut timer = SystemTimer::new();
        let before = SystemTime::now();
        let start = timer.start().expect("start never fails");
        assert!(start >= before);
    }

    #[test]
    fn test_wait_returns_true_once_deadline_passes() {
        let timer = SystemTimer::new();
        let deadline = SystemTime::now() + Duration::from_millis(20);
        assert!(timer.wait(deadline));
    }

    #[test]
    fn test_wait_returns_false_when_cancelled_early() {
        use std::sync::Arc;
        let timer = Arc::new(SystemTimer::new());
        let timer2 = timer.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            timer2.cancel.post();
        });

        let deadline = SystemTime::now() + Duration::from_secs(5);
        assert!(!timer.wait(deadline));
    }
}
