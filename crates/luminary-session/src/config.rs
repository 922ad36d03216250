use std::time::Duration;

use luminary_engine::BufferConfig;
use luminary_signal::TICK_PERIOD;
use luminary_visual::FRAME_INTERVAL;

/// Period of the crystal attunement chime.
pub const CHIME_PERIOD: Duration = Duration::from_millis(12_000);

/// Timing and audio format of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub signal_period: Duration,
    pub chime_period: Duration,
    pub frame_interval: Duration,
    pub audio: BufferConfig,
    /// Fixes every random draw when set.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signal_period: TICK_PERIOD,
            chime_period: CHIME_PERIOD,
            frame_interval: FRAME_INTERVAL,
            audio: BufferConfig::default(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_audio(mut self, audio: BufferConfig) -> Self {
        self.audio = audio;
        self
    }
}
