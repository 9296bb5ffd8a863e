use std::time::{Duration, Instant};

/// Wall-clock stopwatch used for frame and reference-render diagnostics.
#[derive(Clone, Debug)]
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Timer {
            start: Instant::now(),
        }
    }

    /// Seconds since construction or the last reset.
    pub fn elapsed(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    pub fn elapsed_duration(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }

    /// Returns the elapsed time and restarts the timer, for per-frame deltas.
    pub fn lap(&mut self) -> f32 {
        let elapsed = self.elapsed();
        self.reset();
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lap_restarts_the_timer() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));

        let first = timer.lap();
        assert!(first >= 0.004);
        assert!(timer.elapsed() < first);
    }
}
