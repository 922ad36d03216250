//! Tone synthesis graph for Luminary sessions.
//!
//! [`ToneEngine`] owns every voice: solfeggio tones, the PEMF carrier, the
//! Schumann grounding tone and the crystal chime. Voices live in a
//! [`VoiceBank`] that is rendered either by the caller ([`OfflineDevice`])
//! or by a platform callback (`CpalDevice`, behind the `native` feature).

pub mod bank;
pub mod buffer;
pub mod device;
pub mod engine;
pub mod error;
#[cfg(feature = "native")]
pub mod native;
pub mod osc;
pub mod param;
pub mod voice;

pub use bank::{VoiceBank, CHIME_FREQUENCY, CHIME_PEAK_GAIN, SCHUMANN_GAIN};
pub use buffer::{AudioBuffer, BufferConfig, ChannelLayout};
pub use device::{DeviceClock, OfflineDevice, SharedBank, ToneDevice, UnavailableDevice};
pub use engine::ToneEngine;
pub use error::AudioError;
#[cfg(feature = "native")]
pub use native::CpalDevice;
pub use osc::{Oscillator, Waveform};
pub use param::{AudioParam, RampShape};
pub use voice::{Voice, VoiceId, VoiceRole, VoiceSlot};
