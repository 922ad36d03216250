use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::RumbleEffect;

pub const DEFAULT_PULSE: Duration = Duration::from_millis(100);
pub const HEARTBEAT_THUMP: Duration = Duration::from_millis(80);
pub const HEARTBEAT_ECHO: Duration = Duration::from_millis(60);
pub const HEARTBEAT_ECHO_DELAY: Duration = Duration::from_millis(120);
pub const CRYSTAL_PERIOD: Duration = Duration::from_millis(250);
const CRYSTAL_STRONG: f32 = 0.8;
const CRYSTAL_WEAK: f32 = 0.3;
/// Heart rates below this are treated as this when deriving beat intervals.
pub const MIN_BEAT_BPM: f32 = 1.0;

/// Pulse timing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HapticPattern {
    /// One short pulse per heart beat.
    #[default]
    Default,
    /// Long pulses at a configurable period and duty cycle.
    Wave,
    /// Double thump per heart beat.
    Heartbeat,
    /// Fast asymmetric rumble.
    Crystal,
}

impl HapticPattern {
    pub const ALL: [HapticPattern; 4] = [
        HapticPattern::Default,
        HapticPattern::Wave,
        HapticPattern::Heartbeat,
        HapticPattern::Crystal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HapticPattern::Default => "DEFAULT",
            HapticPattern::Wave => "WAVE",
            HapticPattern::Heartbeat => "HEARTBEAT",
            HapticPattern::Crystal => "CRYSTAL",
        }
    }
}

impl fmt::Display for HapticPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown haptic pattern `{0}`")]
pub struct UnknownPattern(pub String);

impl FromStr for HapticPattern {
    type Err = UnknownPattern;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        HapticPattern::ALL
            .into_iter()
            .find(|pattern| pattern.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| UnknownPattern(value.to_string()))
    }
}

/// User-tunable inputs shared by every pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternParams {
    pub intensity: f32,
    pub wave_interval_ms: u32,
    pub wave_duty_cycle: f32,
    pub heartbeat_mod: f32,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            wave_interval_ms: 500,
            wave_duty_cycle: 0.8,
            heartbeat_mod: 0.7,
        }
    }
}

impl PatternParams {
    pub fn wave_period(&self) -> Duration {
        Duration::from_millis(u64::from(self.wave_interval_ms.max(1)))
    }

    fn wave_pulse(&self) -> Duration {
        let duty = if self.wave_duty_cycle.is_finite() {
            self.wave_duty_cycle.max(0.0)
        } else {
            0.0
        };
        let millis = self.wave_interval_ms as f32 * duty;
        Duration::from_micros((f64::from(millis) * 1_000.0).round() as u64)
    }

    /// Effect played by each tick of a repeating pattern. `None` for
    /// [`HapticPattern::Heartbeat`], which has its own two-stage loop.
    pub fn pulse(&self, pattern: HapticPattern) -> Option<RumbleEffect> {
        match pattern {
            HapticPattern::Default => Some(RumbleEffect::uniform(self.intensity, DEFAULT_PULSE)),
            HapticPattern::Wave => Some(RumbleEffect::uniform(self.intensity, self.wave_pulse())),
            HapticPattern::Crystal => Some(RumbleEffect::new(
                self.intensity * CRYSTAL_STRONG,
                self.intensity * CRYSTAL_WEAK,
                CRYSTAL_PERIOD,
            )),
            HapticPattern::Heartbeat => None,
        }
    }

    pub fn thump(&self) -> RumbleEffect {
        RumbleEffect::uniform(self.intensity, HEARTBEAT_THUMP)
    }

    pub fn echo(&self) -> RumbleEffect {
        RumbleEffect::uniform(self.intensity * self.heartbeat_mod, HEARTBEAT_ECHO)
    }
}

/// Time between beats at `heart_rate`.
pub fn beat_interval(heart_rate: f32) -> Duration {
    let bpm = f64::from(heart_rate.max(MIN_BEAT_BPM));
    Duration::from_micros((60_000_000.0 / bpm).round() as u64)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn pulses_stay_within_actuator_limits(
            intensity in -1.0f32..2.0,
            wave_interval_ms in 0u32..5_000,
            wave_duty_cycle in -1.0f32..2.0,
        ) {
            let params = PatternParams {
                intensity,
                wave_interval_ms,
                wave_duty_cycle,
                ..PatternParams::default()
            };
            for pattern in HapticPattern::ALL {
                if let Some(pulse) = params.pulse(pattern) {
                    prop_assert!((0.0..=1.0).contains(&pulse.strong()));
                    prop_assert!((0.0..=1.0).contains(&pulse.weak()));
                    prop_assert!(pulse.duration() >= crate::device::MIN_EFFECT_DURATION);
                }
            }
        }

        #[test]
        fn beat_interval_never_exceeds_one_minute(heart_rate in -500.0f32..500.0) {
            prop_assert!(beat_interval(heart_rate) <= Duration::from_secs(60));
        }
    }

    #[test]
    fn beat_interval_follows_heart_rate() {
        assert_eq!(beat_interval(60.0), Duration::from_secs(1));
        assert_eq!(beat_interval(120.0), Duration::from_millis(500));
        assert_eq!(beat_interval(0.0), Duration::from_secs(60));
        assert_eq!(beat_interval(-20.0), Duration::from_secs(60));
        assert_eq!(beat_interval(f32::NAN), Duration::from_secs(60));
    }

    #[test]
    fn wave_pulse_uses_duty_cycle() {
        let params = PatternParams::default();
        let pulse = params.pulse(HapticPattern::Wave).unwrap();
        assert_eq!(pulse.duration(), Duration::from_millis(400));
        assert_eq!(params.wave_period(), Duration::from_millis(500));
    }

    #[test]
    fn crystal_is_asymmetric() {
        let params = PatternParams {
            intensity: 0.5,
            ..PatternParams::default()
        };
        let pulse = params.pulse(HapticPattern::Crystal).unwrap();
        assert!((pulse.strong() - 0.4).abs() < 1e-6);
        assert!((pulse.weak() - 0.15).abs() < 1e-6);
        assert!(params.pulse(HapticPattern::Heartbeat).is_none());
    }

    #[test]
    fn echo_is_scaled_thump() {
        let params = PatternParams::default();
        assert_eq!(params.thump().strong(), 1.0);
        assert!((params.echo().strong() - 0.7).abs() < 1e-6);
        assert_eq!(params.echo().duration(), HEARTBEAT_ECHO);
    }

    #[test]
    fn patterns_parse_case_insensitively() {
        assert_eq!("heartbeat".parse(), Ok(HapticPattern::Heartbeat));
        assert_eq!("WAVE".parse(), Ok(HapticPattern::Wave));
        let err = "pulse".parse::<HapticPattern>().unwrap_err();
        assert_eq!(err.to_string(), "unknown haptic pattern `pulse`");
    }
}
