//! Flicker timer
//!
//! Pulses the displayed grain intensity between the user-set base value and
//! a dimmed floor, at a user-controlled rate. Above the steady threshold the
//! timer stops toggling and passes the base value through unchanged, which
//! reads on screen as constant full-rate shimmer.

/// Rates at or above this are treated as "steady": no toggling, output is
/// always the base intensity.
pub const STEADY_THRESHOLD_HZ: f64 = 59.0;

/// Intensity multiplier applied in the LOW phase. The low phase deliberately
/// never reaches zero; a full blackout of the grain looks like a rendering
/// glitch rather than a flicker.
pub const LOW_PHASE_FACTOR: f32 = 0.4;

/// Flicker phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    High,
    Low,
}

/// Per-frame flicker state machine.
///
/// `tick` must be called once per rendered frame with a monotonic clock
/// value in seconds. Between toggle instants the output holds the last
/// computed value.
pub struct FlickerTimer {
    phase: Phase,
    next_toggle: f64,
    output: f32,
}

impl FlickerTimer {
    pub fn new() -> Self {
        Self {
            phase: Phase::High,
            next_toggle: 0.0,
            output: 0.0,
        }
    }

    /// Advance the state machine and return the intensity to display.
    ///
    /// * `now` - monotonic time in seconds
    /// * `rate_hz` - configured flicker rate; values at or above
    ///   [`STEADY_THRESHOLD_HZ`], and non-positive values, disable toggling
    /// * `base` - the raw intensity from the user's slider
    pub fn tick(&mut self, now: f64, rate_hz: f64, base: f32) -> f32 {
        if rate_hz >= STEADY_THRESHOLD_HZ || rate_hz <= 0.0 {
            // Steady mode: no phase change, raw value passes through.
            self.output = base;
            return self.output;
        }

        if now >= self.next_toggle {
            self.phase = match self.phase {
                Phase::High => Phase::Low,
                Phase::Low => Phase::High,
            };
            self.next_toggle = now + 1.0 / rate_hz;
        }

        self.output = match self.phase {
            Phase::High => base,
            Phase::Low => base * LOW_PHASE_FACTOR,
        };
        self.output
    }

    /// Last value produced by `tick`.
    pub fn output(&self) -> f32 {
        self.output
    }
}

impl Default for FlickerTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_above_threshold() {
        let mut timer = FlickerTimer::new();
        for i in 0..240 {
            let now = i as f64 / 60.0;
            assert_eq!(timer.tick(now, 60.0, 0.8), 0.8);
        }
    }

    #[test]
    fn steady_at_threshold() {
        let mut timer = FlickerTimer::new();
        assert_eq!(timer.tick(0.0, 59.0, 0.5), 0.5);
        assert_eq!(timer.tick(1.0, 59.0, 0.5), 0.5);
    }

    #[test]
    fn zero_rate_is_steady_not_division_by_zero() {
        let mut timer = FlickerTimer::new();
        assert_eq!(timer.tick(0.0, 0.0, 0.7), 0.7);
        assert_eq!(timer.tick(10.0, 0.0, 0.7), 0.7);
    }

    #[test]
    fn toggles_at_configured_period() {
        // 2 Hz: phase flips every 0.5 s. First tick at t=0 flips High->Low.
        let mut timer = FlickerTimer::new();

        assert_eq!(timer.tick(0.0, 2.0, 1.0), 0.4);
        // Held until the next toggle instant.
        assert_eq!(timer.tick(0.25, 2.0, 1.0), 0.4);
        assert_eq!(timer.tick(0.49, 2.0, 1.0), 0.4);
        // t=0.5 crosses next_toggle, back to High.
        assert_eq!(timer.tick(0.5, 2.0, 1.0), 1.0);
        assert_eq!(timer.tick(0.75, 2.0, 1.0), 1.0);
        assert_eq!(timer.tick(1.0, 2.0, 1.0), 0.4);
    }

    #[test]
    fn low_phase_uses_documented_floor() {
        let mut timer = FlickerTimer::new();
        let low = timer.tick(0.0, 1.0, 0.5);
        assert!((low - 0.5 * LOW_PHASE_FACTOR).abs() < 1e-6);
        assert!(low > 0.0);
    }

    #[test]
    fn base_changes_apply_between_toggles() {
        let mut timer = FlickerTimer::new();
        timer.tick(0.0, 2.0, 1.0);
        timer.tick(0.5, 2.0, 1.0);
        // Slider moved mid-phase: output tracks the new base immediately.
        assert_eq!(timer.tick(0.6, 2.0, 0.5), 0.5);
    }

    #[test]
    fn full_cycle_period_matches_rate() {
        let mut timer = FlickerTimer::new();
        let rate = 4.0;
        let dt = 1.0 / 240.0;
        let mut transitions = Vec::new();
        let mut last = timer.tick(0.0, rate, 1.0);
        let mut t = dt;
        while t < 2.0 {
            let out = timer.tick(t, rate, 1.0);
            if out != last {
                transitions.push(t);
                last = out;
            }
            t += dt;
        }
        // 4 Hz toggle rate over 2 s after the initial flip: ~8 transitions.
        assert!(transitions.len() >= 7 && transitions.len() <= 8);
        for pair in transitions.windows(2) {
            let period = pair[1] - pair[0];
            assert!((period - 1.0 / rate).abs() < 2.0 * dt);
        }
    }
}
