use std::time::Duration;

use rand::Rng;

use crate::state::{classify, AffectState};

/// Resting heart rate the walk reverts towards.
pub const BASELINE_BPM: f32 = 70.0;

/// Period of the biofeedback tick.
pub const TICK_PERIOD: Duration = Duration::from_millis(2000);

const REVERSION: f32 = 0.01;

/// Outcome of one [`HeartRateWalk::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalTick {
    /// State computed from the heart rate before the step. Parameter pushes
    /// for the tick are derived from this state.
    pub previous_state: AffectState,
    pub heart_rate: f32,
    pub state: AffectState,
}

/// Synthetic heart rate: mean reversion to 70 bpm, uniform noise in
/// `[-1, 1)` and a bias that reinforces the current state. The walk is not
/// clamped, so a long stressed run drifts upwards without bound.
#[derive(Debug, Clone)]
pub struct HeartRateWalk {
    heart_rate: f32,
}

impl Default for HeartRateWalk {
    fn default() -> Self {
        Self::new(BASELINE_BPM)
    }
}

impl HeartRateWalk {
    pub fn new(heart_rate: f32) -> Self {
        Self { heart_rate }
    }

    pub fn heart_rate(&self) -> f32 {
        self.heart_rate
    }

    pub fn state(&self) -> AffectState {
        classify(self.heart_rate)
    }

    /// Overrides the heart rate, e.g. from an external reading.
    pub fn set(&mut self, heart_rate: f32) {
        self.heart_rate = heart_rate;
    }

    pub fn reset(&mut self) {
        self.heart_rate = BASELINE_BPM;
    }

    /// Advances the walk by one step using `rng` for the noise term.
    pub fn tick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> SignalTick {
        let noise = rng.gen_range(-1.0f32..1.0);
        self.step(noise)
    }

    /// Advances the walk with an explicit noise sample.
    pub fn step(&mut self, noise: f32) -> SignalTick {
        let previous_state = classify(self.heart_rate);
        let trend = (BASELINE_BPM - self.heart_rate) * REVERSION;
        self.heart_rate += trend + noise + previous_state.bias();
        let state = classify(self.heart_rate);
        if state != previous_state {
            tracing::debug!(
                from = %previous_state,
                to = %state,
                heart_rate = self.heart_rate,
                "affect state changed"
            );
        }
        SignalTick {
            previous_state,
            heart_rate: self.heart_rate,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_without_noise_is_fixed_point() {
        let mut walk = HeartRateWalk::default();
        let tick = walk.step(0.0);
        assert_eq!(tick.heart_rate, BASELINE_BPM);
        assert_eq!(tick.previous_state, AffectState::Calm);
    }

    #[test]
    fn stressed_step_includes_bias_and_reversion() {
        let mut walk = HeartRateWalk::new(90.0);
        let tick = walk.step(0.5);
        // trend (70 - 90) * 0.01 = -0.2, noise 0.5, bias +0.2
        assert!((tick.heart_rate - 90.5).abs() < 1e-4);
        assert_eq!(tick.previous_state, AffectState::Stressed);
    }

    #[test]
    fn intuitive_bias_is_negative() {
        let mut walk = HeartRateWalk::new(50.0);
        let tick = walk.step(0.0);
        // trend +0.2, bias -0.2
        assert!((tick.heart_rate - 50.0).abs() < 1e-4);
        assert_eq!(tick.state, AffectState::Intuitive);
    }

    #[test]
    fn previous_state_reflects_rate_before_step() {
        let mut walk = HeartRateWalk::new(80.5);
        let tick = walk.step(-1.0);
        assert_eq!(tick.previous_state, AffectState::Stressed);
        assert_eq!(tick.state, AffectState::Calm);
    }

    #[test]
    fn walk_is_not_clamped() {
        let mut walk = HeartRateWalk::new(500.0);
        walk.step(1.0);
        assert!(walk.heart_rate() > 490.0);
        walk.reset();
        assert_eq!(walk.heart_rate(), BASELINE_BPM);
    }
}
