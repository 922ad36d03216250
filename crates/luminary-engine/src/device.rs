use std::sync::Arc;

use parking_lot::Mutex;

use crate::bank::VoiceBank;
use crate::buffer::BufferConfig;
use crate::error::{AudioError, Result};

/// Voice bank shared between the control side and the output callback.
pub type SharedBank = Arc<Mutex<VoiceBank>>;

/// Who advances the audio clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClock {
    /// The owner renders blocks explicitly via [`crate::ToneEngine::advance`].
    Manual,
    /// The device pulls blocks from its own callback thread.
    Realtime,
}

/// Output sink for the tone graph.
pub trait ToneDevice {
    fn name(&self) -> &str;

    fn clock(&self) -> DeviceClock;

    /// Acquires the device and reports the format it will run at.
    fn open(&mut self, preferred: &BufferConfig) -> Result<BufferConfig>;

    /// Begins pulling audio from `bank`.
    fn start(&mut self, bank: SharedBank) -> Result<()>;

    fn close(&mut self);
}

/// Device driven by the caller's clock; used for rendering to files and in
/// tests.
#[derive(Debug, Default)]
pub struct OfflineDevice {
    open: bool,
}

impl OfflineDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl ToneDevice for OfflineDevice {
    fn name(&self) -> &str {
        "offline"
    }

    fn clock(&self) -> DeviceClock {
        DeviceClock::Manual
    }

    fn open(&mut self, preferred: &BufferConfig) -> Result<BufferConfig> {
        self.open = true;
        Ok(preferred.clone())
    }

    fn start(&mut self, _bank: SharedBank) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Device that never opens, standing in for hosts without audio output.
#[derive(Debug, Default)]
pub struct UnavailableDevice {
    reason: String,
}

impl UnavailableDevice {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ToneDevice for UnavailableDevice {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn clock(&self) -> DeviceClock {
        DeviceClock::Manual
    }

    fn open(&mut self, _preferred: &BufferConfig) -> Result<BufferConfig> {
        let reason = if self.reason.is_empty() {
            "no output device".to_string()
        } else {
            self.reason.clone()
        };
        Err(AudioError::DeviceUnavailable(reason))
    }

    fn start(&mut self, _bank: SharedBank) -> Result<()> {
        Err(AudioError::DeviceUnavailable(self.reason.clone()))
    }

    fn close(&mut self) {}
}
