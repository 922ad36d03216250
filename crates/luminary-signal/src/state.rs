use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::StateProfile;

/// Heart rate above which the simulated body is considered stressed.
pub const STRESSED_ABOVE_BPM: f32 = 80.0;
/// Heart rate above which (and up to [`STRESSED_ABOVE_BPM`]) the body is calm.
pub const CALM_ABOVE_BPM: f32 = 60.0;

/// Affective category derived from the current heart rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AffectState {
    Stressed,
    Calm,
    Intuitive,
}

impl AffectState {
    pub const ALL: [AffectState; 3] = [
        AffectState::Stressed,
        AffectState::Calm,
        AffectState::Intuitive,
    ];

    /// Static profile for this state.
    pub fn profile(self) -> &'static StateProfile {
        StateProfile::for_state(self)
    }

    /// Drift added to the heart-rate walk while this state is active.
    pub fn bias(self) -> f32 {
        match self {
            AffectState::Stressed => 0.2,
            AffectState::Calm => 0.0,
            AffectState::Intuitive => -0.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AffectState::Stressed => "STRESSED",
            AffectState::Calm => "CALM",
            AffectState::Intuitive => "INTUITIVE",
        }
    }
}

impl fmt::Display for AffectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a heart rate. Pure and total: `> 80` is stressed, `> 60` is
/// calm, anything else (including NaN) is intuitive.
pub fn classify(heart_rate: f32) -> AffectState {
    if heart_rate > STRESSED_ABOVE_BPM {
        AffectState::Stressed
    } else if heart_rate > CALM_ABOVE_BPM {
        AffectState::Calm
    } else {
        AffectState::Intuitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_exclusive_from_below() {
        assert_eq!(classify(80.0), AffectState::Calm);
        assert_eq!(classify(80.01), AffectState::Stressed);
        assert_eq!(classify(60.0), AffectState::Intuitive);
        assert_eq!(classify(60.01), AffectState::Calm);
    }

    #[test]
    fn extreme_values_classify() {
        assert_eq!(classify(f32::INFINITY), AffectState::Stressed);
        assert_eq!(classify(f32::NEG_INFINITY), AffectState::Intuitive);
        assert_eq!(classify(f32::NAN), AffectState::Intuitive);
        assert_eq!(classify(-12.0), AffectState::Intuitive);
    }

    #[test]
    fn bias_pushes_away_from_calm() {
        assert!(AffectState::Stressed.bias() > 0.0);
        assert_eq!(AffectState::Calm.bias(), 0.0);
        assert!(AffectState::Intuitive.bias() < 0.0);
        assert_eq!(AffectState::Intuitive.to_string(), "INTUITIVE");
    }
}
