use std::f32::consts::{PI, TAU};

/// Oscillator waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
}

/// Phase-accumulating oscillator producing values in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
    phase_delta: f32,
    sample_rate: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        let mut osc = Self {
            waveform,
            frequency: 0.0,
            phase: 0.0,
            phase_delta: 0.0,
            sample_rate: sample_rate.max(f32::EPSILON),
        };
        osc.set_frequency(frequency);
        osc
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Retunes without resetting phase, so playback stays continuous.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = if frequency.is_finite() {
            frequency.max(0.0)
        } else {
            0.0
        };
        self.phase_delta = (TAU * self.frequency) / self.sample_rate;
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = match self.waveform {
            Waveform::Sine => self.phase.sin(),
            Waveform::Square => {
                if self.phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        self.phase = (self.phase + self.phase_delta).rem_euclid(TAU);
        value
    }
}
