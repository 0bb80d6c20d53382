//! Per-chunk progress estimation.
//!
//! Most speech engines never say how far into an utterance they are, so the
//! controller simulates it: each chunk gets an estimated duration of
//! `chars × 70 ms / rate`, and a 100 ms ticker moves the value forward in
//! equal steps. The simulation stops at [`SIMULATED_CEILING`]; only the real
//! completion event takes it to 100.
//!
//! Backends that do report progress overwrite the simulated value through
//! [`ProgressEstimator::report`]. Whichever writes last wins.
//!
//! The estimator owns the notion of "the timer is running". The run loop
//! keeps a ticker alive only while [`ProgressEstimator::is_armed`] holds, and
//! recreates it whenever [`ProgressEstimator::generation`] changes.

use std::time::Duration;

/// Speech duration per character at 1.0× rate.
pub const MS_PER_CHAR: f64 = 70.0;
/// Interval between simulated progress steps.
pub const TICK: Duration = Duration::from_millis(100);
/// Highest value the simulation reports on its own.
pub const SIMULATED_CEILING: f32 = 95.0;

/// Simulated/real progress for the chunk currently being spoken.
#[derive(Debug, Clone, Default)]
pub struct ProgressEstimator {
    value: f32,
    step: f32,
    armed: bool,
    generation: u64,
}

impl ProgressEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimated speaking time for `char_len` characters at `rate`.
    pub fn estimated_duration(char_len: usize, rate: f32) -> Duration {
        let rate = if rate > 0.0 { rate as f64 } else { 1.0 };
        Duration::from_secs_f64(char_len.max(1) as f64 * MS_PER_CHAR / rate / 1000.0)
    }

    /// Reset to 0 and arm the timer for a chunk of `char_len` characters.
    pub fn start(&mut self, char_len: usize, rate: f32) {
        let estimated_ms = Self::estimated_duration(char_len, rate).as_secs_f64() * 1000.0;
        self.value = 0.0;
        self.step = (100.0 * TICK.as_millis() as f64 / estimated_ms) as f32;
        self.arm();
    }

    /// Advance one tick. Returns the new value, or `None` when disarmed.
    pub fn tick(&mut self) -> Option<f32> {
        if !self.armed {
            return None;
        }
        if self.value < SIMULATED_CEILING {
            self.value = (self.value + self.step).min(SIMULATED_CEILING);
        }
        Some(self.value)
    }

    /// The chunk really finished: disarm and report 100.
    pub fn complete(&mut self) -> f32 {
        self.armed = false;
        self.value = 100.0;
        self.value
    }

    /// Overwrite with a backend-reported value.
    pub fn report(&mut self, value: f32) -> f32 {
        if !value.is_nan() {
            self.value = value.clamp(0.0, 100.0);
        }
        self.value
    }

    /// Stop ticking, keeping the current value (pause, stop, error).
    pub fn halt(&mut self) {
        self.armed = false;
    }

    /// Resume ticking from the current value after a pause.
    pub fn resume(&mut self) {
        if self.value < 100.0 {
            self.arm();
        }
    }

    /// Forget everything (new document).
    pub fn reset(&mut self) {
        self.halt();
        self.value = 0.0;
        self.step = 0.0;
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Changes every time the timer is (re)armed.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn arm(&mut self) {
        self.armed = true;
        self.generation = self.generation.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_calibration() {
        // 100 chars at 1.0× → 7 000 ms → 100 × 100 / 7000 ≈ 1.4286 % per tick
        let mut p = ProgressEstimator::new();
        p.start(100, 1.0);
        let v = p.tick().unwrap();
        assert!((v - 1.428_571).abs() < 1e-3, "{v}");
    }

    #[test]
    fn faster_rate_means_bigger_steps() {
        let mut slow = ProgressEstimator::new();
        let mut fast = ProgressEstimator::new();
        slow.start(100, 1.0);
        fast.start(100, 2.0);
        assert!(fast.tick().unwrap() > slow.tick().unwrap());
        assert_eq!(
            ProgressEstimator::estimated_duration(100, 2.0),
            Duration::from_millis(3_500)
        );
    }

    #[test]
    fn simulation_never_reaches_100() {
        let mut p = ProgressEstimator::new();
        p.start(3, 3.0);
        for _ in 0..1_000 {
            let v = p.tick().unwrap();
            assert!(v <= SIMULATED_CEILING);
        }
        assert_eq!(p.value(), SIMULATED_CEILING);
    }

    #[test]
    fn completion_reports_exactly_100_and_disarms() {
        let mut p = ProgressEstimator::new();
        p.start(50, 1.0);
        p.tick();
        assert_eq!(p.complete(), 100.0);
        assert!(!p.is_armed());
        assert_eq!(p.tick(), None);
        assert_eq!(p.value(), 100.0);
    }

    #[test]
    fn backend_report_overwrites_simulation() {
        let mut p = ProgressEstimator::new();
        p.start(1_000, 1.0);
        p.tick();
        assert_eq!(p.report(60.0), 60.0);
        let next = p.tick().unwrap();
        assert!(next > 60.0 && next < 61.0);
        assert_eq!(p.report(150.0), 100.0);
        assert_eq!(p.report(f32::NAN), 100.0);
    }

    #[test]
    fn halt_stops_ticking_and_resume_continues() {
        let mut p = ProgressEstimator::new();
        p.start(100, 1.0);
        p.tick();
        let held = p.value();
        p.halt();
        assert_eq!(p.tick(), None);
        assert_eq!(p.value(), held);

        let generation = p.generation();
        p.resume();
        assert!(p.is_armed());
        assert_ne!(p.generation(), generation);
        assert!(p.tick().unwrap() > held);
    }

    #[test]
    fn restart_resets_value() {
        let mut p = ProgressEstimator::new();
        p.start(10, 1.0);
        for _ in 0..5 {
            p.tick();
        }
        assert!(p.value() > 0.0);
        p.start(10, 1.0);
        assert_eq!(p.value(), 0.0);
    }

    #[test]
    fn resume_after_completion_stays_disarmed() {
        let mut p = ProgressEstimator::new();
        p.start(10, 1.0);
        p.complete();
        p.resume();
        assert!(!p.is_armed());
    }
}
