use std::time::{Duration, Instant};

/// Utility for keeping track of the time it took to perform some operation.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new `Timer`, started now.
    pub fn now() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Reset internal timer to now.
    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Time since the timer was created or last reset.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Print a message with the elapsed time since the timer was last reset.
    pub fn print_elapsed(&self, task: &str) {
        eprintln!("{} took {:?}", task, self.elapsed());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn test_reset_restarts_clock() {
        let mut timer = Timer::now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed() >= Duration::from_millis(5));
        timer.reset();
        assert!(timer.elapsed() < Duration::from_secs(5));
    }
}
