use luminary_haptics::HapticPattern;
use serde::Serialize;

/// What is playing when the session is not in biofeedback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManualMode {
    #[default]
    None,
    Solfeggio,
    Pemf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityChannel {
    Tone,
    Pemf,
    Haptic,
}

/// Calls from the control surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    StartBiofeedback,
    PlayManualTone(f32),
    PlayManualPemf,
    /// Raw user entries; anything that is not a positive number is dropped.
    PlayCustomTones(Vec<String>),
    Stop,
    ToggleGrounding,
    ToggleCrystalAttunement,
    ToggleHaptics,
    SetIntensity(IntensityChannel, f32),
    SetHapticPattern(HapticPattern),
    SetHapticPatternParams {
        wave_interval_ms: Option<u32>,
        wave_duty_cycle: Option<f32>,
        heartbeat_mod: Option<f32>,
    },
    SetHeartRate(f32),
    ClearSettings,
}

/// Parses custom tone entries, keeping finite positive values.
pub fn parse_frequencies<S: AsRef<str>>(entries: &[S]) -> Vec<f32> {
    entries
        .iter()
        .filter_map(|entry| entry.as_ref().trim().parse::<f32>().ok())
        .filter(|frequency| frequency.is_finite() && *frequency > 0.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn parsed_frequencies_are_finite_and_positive(entries in proptest::collection::vec(".{0,8}", 0..12)) {
            for frequency in parse_frequencies(&entries) {
                prop_assert!(frequency.is_finite());
                prop_assert!(frequency > 0.0);
            }
        }

        #[test]
        fn formatted_positive_numbers_survive(values in proptest::collection::vec(0.1f32..20_000.0, 1..8)) {
            let entries: Vec<String> = values.iter().map(|value| value.to_string()).collect();
            prop_assert_eq!(parse_frequencies(&entries), values);
        }
    }

    #[test]
    fn keeps_only_positive_numbers() {
        let parsed = parse_frequencies(&["432", " 528.5 ", "", "abc", "-3", "0", "inf", "NaN"]);
        assert_eq!(parsed, vec![432.0, 528.5]);
    }
}
